use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::migrations::run_migrations;
use crate::config::DatabaseConfig;
use crate::errors::AppResult;
use crate::log_info;

/// Initialize the SQLite ledger database with connection pooling.
/// The database file lives in the given directory.
///
/// Features:
/// - WAL mode for concurrent reads/writes
/// - Connection pooling with configurable size
/// - Foreign keys enforcement
/// - Busy timeout so concurrent distributions wait instead of failing
pub async fn init_db(app_data_dir: &Path, config: &DatabaseConfig) -> AppResult<SqlitePool> {
    std::fs::create_dir_all(app_data_dir)
        .map_err(|e| crate::errors::AppError::Internal(format!("Cannot create data dir: {}", e)))?;

    let db_path = app_data_dir.join(&config.path);
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    log_info!("DATABASE", "Connection pool initialized", serde_json::json!({
        "min_connections": config.min_connections,
        "max_connections": config.max_connections,
        "db": db_path.display().to_string(),
    }));

    Ok(pool)
}

/// Open a migrated in-memory database.
///
/// Each SQLite memory connection is its own database, so the pool is pinned
/// to a single connection that is never recycled.
pub async fn init_memory_db() -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Health check for the database connection
pub async fn health_check(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Row counts of the ledger tables
pub async fn get_db_stats(pool: &SqlitePool) -> Result<serde_json::Value, sqlx::Error> {
    let mut tables = serde_json::Map::new();

    for table in [
        "users",
        "commission_configs",
        "commission_distributions",
        "commission_transactions",
        "wallet_transactions",
        "activity_logs",
    ] {
        // Table names come from the fixed list above.
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await?;
        tables.insert(table.to_string(), serde_json::json!(count));
    }

    Ok(serde_json::json!({
        "pool_size": pool.size(),
        "idle_connections": pool.num_idle(),
        "tables": tables,
    }))
}
