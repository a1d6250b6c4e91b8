pub mod audit;
pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod ledger;
pub mod logger;
pub mod models;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::Path;
use std::time::Instant;

use config::CommissionSettings;
use errors::{AppError, AppResult};
use logger::LoggerConfig;

/// Shared ledger state, held by the embedding application.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub settings: CommissionSettings,
    pub started_at: Instant,
}

impl AppState {
    /// Load configuration, start the logger and open the ledger database
    /// under `app_data_dir`.
    pub async fn init(app_data_dir: &Path) -> AppResult<Self> {
        config::AppConfig::load_from_file(&app_data_dir.join(".env"));
        let config = config::init_config();
        config.validate().map_err(AppError::Validation)?;

        if let Err(e) = logger::init_global_logger(app_data_dir, LoggerConfig::from(&config.logging)) {
            eprintln!("⚠️  Warning: Failed to initialize logger: {}", e);
        }

        log_info!("APP", "Commission ledger starting", serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "environment": config.environment.as_str(),
            "app_data_dir": app_data_dir.to_string_lossy(),
            "orphan_policy": config.commission.orphan_policy.as_str(),
        }));

        let pool = database::connection::init_db(app_data_dir, &config.database).await?;

        Ok(Self {
            db: pool,
            settings: config.commission.clone(),
            started_at: Instant::now(),
        })
    }

    /// Ledger on a fresh in-memory database.
    pub async fn in_memory(settings: CommissionSettings) -> AppResult<Self> {
        Ok(Self {
            db: database::connection::init_memory_db().await?,
            settings,
            started_at: Instant::now(),
        })
    }
}
