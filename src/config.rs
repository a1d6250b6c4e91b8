//! Environment-based configuration module
//!
//! This module provides configuration management for different environments:
//! - Development: Verbose human-readable logging
//! - Production: Minimal JSON logging, stricter validation
//!
//! Configuration can be set via:
//! 1. Environment variables (highest priority)
//! 2. .env file
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::{env, fs};

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Get environment from APP_ENV variable or default to Development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").unwrap_or_default().as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// What happens to the share of a tier that has no beneficiary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// The share is not credited to anyone.
    #[default]
    Vanish,
    /// The share moves to the next higher tier that has a beneficiary.
    RollUp,
    /// The share goes to the admin of the chain, if one was found.
    Admin,
}

impl OrphanPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrphanPolicy::Vanish => "vanish",
            OrphanPolicy::RollUp => "roll_up",
            OrphanPolicy::Admin => "admin",
        }
    }
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vanish" => Ok(OrphanPolicy::Vanish),
            "roll_up" | "rollup" => Ok(OrphanPolicy::RollUp),
            "admin" => Ok(OrphanPolicy::Admin),
            other => Err(format!("Unknown orphan policy '{}'", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment mode
    pub environment: Environment,

    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Commission distribution settings
    pub commission: CommissionSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// `COMMISSION_ORPHAN_POLICY` as set, checked by `validate()`
    #[serde(skip)]
    pub orphan_policy_raw: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path (relative to app data dir)
    pub path: String,

    /// Maximum number of connections
    pub max_connections: u32,

    /// Minimum number of connections
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,

    /// Busy timeout in seconds for concurrent writers
    pub busy_timeout_secs: u64,
}

/// Commission distribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSettings {
    /// Policy for tiers without a beneficiary
    pub orphan_policy: OrphanPolicy,

    /// Maximum number of parent links followed when resolving beneficiaries
    pub max_hierarchy_depth: usize,
}

impl Default for CommissionSettings {
    fn default() -> Self {
        Self {
            orphan_policy: OrphanPolicy::Vanish,
            max_hierarchy_depth: 16,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log to stdout
    pub log_to_stdout: bool,

    /// Use JSON format (true for production)
    pub json_format: bool,

    /// Maximum log file size in MB
    pub max_file_size_mb: u64,

    /// Maximum number of log files to keep
    pub max_log_files: u32,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();
        let orphan_policy_raw = env::var("COMMISSION_ORPHAN_POLICY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Self {
            environment: env,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Commission Ledger".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            database: DatabaseConfig {
                path: env::var("DB_PATH").unwrap_or_else(|_| "ledger.db".to_string()),
                max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
                min_connections: env_parse("DB_MIN_CONNECTIONS").unwrap_or(2),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
                busy_timeout_secs: 30,
            },

            commission: CommissionSettings {
                orphan_policy: orphan_policy_raw
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                max_hierarchy_depth: env_parse("COMMISSION_MAX_DEPTH").unwrap_or(16),
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if env.is_production() { "warn".to_string() } else { "debug".to_string() }
                }),
                log_to_file: true,
                log_to_stdout: env::var("LOG_TO_STDOUT")
                    .map(|s| s == "true")
                    .unwrap_or(true),
                json_format: env.is_production(),
                max_file_size_mb: 10,
                max_log_files: 5,
            },

            orphan_policy_raw,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::default()
    }

    /// Load configuration from a .env file (if exists)
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(path).ok()?;

        // Simple .env parser (key=value format)
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');

                // Set environment variable (will be picked up by load())
                env::set_var(key, value);
            }
        }

        Some(Self::default())
    }

    /// Get the log directory path
    pub fn get_log_dir(&self, app_data_dir: &Path) -> PathBuf {
        app_data_dir.join("logs")
    }

    /// Get the database path
    pub fn get_database_path(&self, app_data_dir: &Path) -> PathBuf {
        app_data_dir.join(&self.database.path)
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database.min_connections > self.database.max_connections {
            return Err(format!(
                "DB_MIN_CONNECTIONS ({}) must not exceed DB_MAX_CONNECTIONS ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }

        if let Some(raw) = &self.orphan_policy_raw {
            raw.parse::<OrphanPolicy>()
                .map_err(|e| format!("COMMISSION_ORPHAN_POLICY: {}", e))?;
        }

        if self.commission.max_hierarchy_depth == 0 {
            return Err("COMMISSION_MAX_DEPTH must be at least 1".to_string());
        }

        if self.is_production() && self.commission.orphan_policy == OrphanPolicy::Vanish {
            eprintln!("⚠️  WARNING: Orphaned commission shares are discarded (COMMISSION_ORPHAN_POLICY=vanish)");
        }

        Ok(())
    }
}

/// Global configuration instance
static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration
pub fn init_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::load)
}

/// Get the global configuration, loading it on first use
pub fn get_config() -> &'static AppConfig {
    init_config()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_policy_parse() {
        assert_eq!("vanish".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Vanish));
        assert_eq!("ROLL_UP".parse::<OrphanPolicy>(), Ok(OrphanPolicy::RollUp));
        assert_eq!(" admin ".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Admin));
        assert!("nobody".parse::<OrphanPolicy>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_pool_sizes() {
        let mut config = AppConfig::load();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let mut config = AppConfig::load();
        config.commission.max_hierarchy_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_misspelled_orphan_policy() {
        let mut config = AppConfig::load();
        config.orphan_policy_raw = Some("roll-up".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("roll-up"));

        config.orphan_policy_raw = Some("roll_up".to_string());
        config.commission.max_hierarchy_depth = 16;
        config.database.min_connections = 1;
        config.database.max_connections = 10;
        assert!(config.validate().is_ok());
    }
}
