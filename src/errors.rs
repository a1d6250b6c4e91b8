use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Data not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No active commission config for service type '{0}'")]
    ConfigNotFound(String),

    #[error("Insufficient funds for user {user_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        user_id: i64,
        balance: i64,
        requested: i64,
    },

    #[error("Hierarchy cycle detected at user {0}")]
    HierarchyCycle(i64),

    #[error("Hierarchy above user {user_id} exceeds max depth {max_depth}")]
    HierarchyTooDeep { user_id: i64, max_depth: usize },

    #[error("Error: {0}")]
    Internal(String),
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;
