//! System commands for health checks and diagnostics
//!
//! This module provides system-level operations:
//! - Health check
//! - Ledger table statistics
//! - System information

use crate::config::get_config;
use crate::database::connection::{get_db_stats, health_check};
use crate::errors::AppResult;
use crate::log_error;
use crate::AppState;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub uptime_secs: u64,
    pub database: DatabaseHealth,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub pool_size: u32,
    pub response_time_ms: f64,
}

/// System information
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub app_version: String,
    pub database_path: String,
    pub log_dir: String,
    pub config: ConfigInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub environment: String,
    pub orphan_policy: String,
    pub max_hierarchy_depth: usize,
    pub logging_level: String,
}

/// Get system health status
pub async fn get_health_status(state: &AppState) -> HealthStatus {
    let start = std::time::Instant::now();

    let db_status = match health_check(&state.db).await {
        Ok(()) => DatabaseHealth {
            status: "healthy".to_string(),
            pool_size: state.db.size(),
            response_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        },
        Err(e) => {
            log_error!("HEALTH_CHECK", "Database health check failed", e.to_string());
            DatabaseHealth {
                status: "unhealthy".to_string(),
                pool_size: 0,
                response_time_ms: 0.0,
            }
        }
    };

    let status = if db_status.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: get_config().environment.as_str().to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        database: db_status,
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Row counts of the ledger tables and pool usage
pub async fn get_ledger_stats(state: &AppState) -> AppResult<serde_json::Value> {
    Ok(get_db_stats(&state.db).await?)
}

/// Get system information
pub fn get_system_info(state: &AppState, app_data_dir: &Path) -> SystemInfo {
    let config = get_config();

    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        database_path: config.get_database_path(app_data_dir).to_string_lossy().to_string(),
        log_dir: config.get_log_dir(app_data_dir).to_string_lossy().to_string(),
        config: ConfigInfo {
            environment: config.environment.as_str().to_string(),
            orphan_policy: state.settings.orphan_policy.as_str().to_string(),
            max_hierarchy_depth: state.settings.max_hierarchy_depth,
            logging_level: config.logging.level.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_chain, state};

    #[tokio::test]
    async fn test_health_status_healthy() {
        let state = state().await;
        let health = get_health_status(&state).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.database.pool_size, 1);
    }

    #[tokio::test]
    async fn test_ledger_stats_count_rows() {
        let state = state().await;
        seed_chain(&state.db).await;

        let stats = get_ledger_stats(&state).await.unwrap();
        assert_eq!(stats["tables"]["users"], 5);
        assert_eq!(stats["tables"]["commission_transactions"], 0);
    }

    #[tokio::test]
    async fn test_system_info_reports_settings() {
        let state = state().await;
        let info = get_system_info(&state, Path::new("/tmp/ledger"));
        assert_eq!(info.config.orphan_policy, "vanish");
        assert!(info.database_path.starts_with("/tmp/ledger"));
    }
}
