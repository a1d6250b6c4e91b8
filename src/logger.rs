//! Structured logging for the ledger
//!
//! This module provides a centralized logging system with:
//! - Log levels (ERROR, WARN, INFO, DEBUG, TRACE)
//! - Structured JSON logging for production
//! - Human-readable logging for development
//! - File rotation for long-running deployments
//! - Sensitive data redaction for ledger payloads

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::config::LoggingConfig;

/// Log levels following RFC 5424
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("RUST_LOG")
            .map(|s| Self::parse(&s))
            .unwrap_or(LogLevel::Info)
    }
}

/// Structured log entry
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub log_to_file: bool,
    pub log_to_stdout: bool,
    pub json_format: bool,
    pub max_file_size_mb: u64,
    pub max_log_files: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::from_env(),
            log_to_file: true,
            log_to_stdout: true,
            json_format: cfg!(not(debug_assertions)),
            max_file_size_mb: 10,
            max_log_files: 5,
        }
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(cfg: &LoggingConfig) -> Self {
        Self {
            level: LogLevel::parse(&cfg.level),
            log_to_file: cfg.log_to_file,
            log_to_stdout: cfg.log_to_stdout,
            json_format: cfg.json_format,
            max_file_size_mb: cfg.max_file_size_mb,
            max_log_files: cfg.max_log_files,
        }
    }
}

/// Main logger instance
pub struct Logger {
    config: LoggerConfig,
    log_dir: PathBuf,
    current_file: Mutex<Option<BufWriter<File>>>,
    current_file_size: Mutex<u64>,
}

impl Logger {
    /// Initialize the logger, creating `<app_data_dir>/logs` if needed
    pub fn init(app_data_dir: &Path, config: LoggerConfig) -> Result<Self, String> {
        let log_dir = app_data_dir.join("logs");

        std::fs::create_dir_all(&log_dir)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;

        let logger = Self {
            config,
            log_dir,
            current_file: Mutex::new(None),
            current_file_size: Mutex::new(0),
        };

        logger.rotate_logs()?;

        Ok(logger)
    }

    /// Get the log file path for today
    pub fn log_file_path(&self) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d");
        self.log_dir.join(format!("ledger-{}.log", date))
    }

    fn numbered_path(&self, n: u32) -> PathBuf {
        self.log_dir.join(format!(
            "ledger-{}.{}.log",
            Local::now().format("%Y-%m-%d"),
            n
        ))
    }

    /// Rotate log files if they exceed the size limit
    fn rotate_logs(&self) -> Result<(), String> {
        let log_path = self.log_file_path();

        if log_path.exists() {
            let metadata = std::fs::metadata(&log_path)
                .map_err(|e| format!("Failed to read log file metadata: {}", e))?;

            let max_size = self.config.max_file_size_mb * 1024 * 1024;

            if metadata.len() >= max_size {
                for i in (1..self.config.max_log_files).rev() {
                    let old_path = self.numbered_path(i);
                    if old_path.exists() {
                        let _ = std::fs::rename(&old_path, self.numbered_path(i + 1));
                    }
                }

                let _ = std::fs::rename(&log_path, self.numbered_path(1));

                let oldest_path = self.numbered_path(self.config.max_log_files);
                if oldest_path.exists() {
                    let _ = std::fs::remove_file(&oldest_path);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        *self
            .current_file
            .lock()
            .map_err(|_| "Log file lock poisoned".to_string())? = Some(BufWriter::new(file));
        *self
            .current_file_size
            .lock()
            .map_err(|_| "Log size lock poisoned".to_string())? = file_size;

        Ok(())
    }

    fn format_line(&self, entry: &LogEntry) -> String {
        if self.config.json_format {
            serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "{} [{}] [{}] {}{}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.target,
                entry.message,
                entry
                    .data
                    .as_ref()
                    .map(|d| format!(" | {}", d))
                    .unwrap_or_default(),
                entry
                    .error
                    .as_ref()
                    .map(|e| format!(" | error: {}", e))
                    .unwrap_or_default()
            )
        }
    }

    fn write(&self, entry: &LogEntry) {
        if entry.level > self.config.level {
            return;
        }

        let log_line = self.format_line(entry);

        if self.config.log_to_stdout {
            match entry.level {
                LogLevel::Error | LogLevel::Warn => eprintln!("{}", log_line),
                _ => println!("{}", log_line),
            }
        }

        if self.config.log_to_file {
            let max_size = self.config.max_file_size_mb * 1024 * 1024;
            let mut needs_rotation = false;

            if let Ok(mut guard) = self.current_file.lock() {
                if let Some(writer) = guard.as_mut() {
                    let _ = writeln!(writer, "{}", log_line);
                    let _ = writer.flush();

                    if let Ok(mut size) = self.current_file_size.lock() {
                        *size += log_line.len() as u64 + 1;
                        needs_rotation = *size >= max_size;
                    }
                }
            }

            if needs_rotation {
                let _ = self.rotate_logs();
            }
        }
    }

    fn entry(
        level: LogLevel,
        target: &str,
        message: &str,
        data: Option<serde_json::Value>,
        error: Option<&str>,
    ) -> LogEntry {
        LogEntry {
            timestamp: Local::now(),
            level,
            target: target.to_string(),
            message: message.to_string(),
            data,
            error: error.map(String::from),
        }
    }

    pub fn error(&self, target: &str, message: &str, error: Option<&str>) {
        self.write(&Self::entry(LogLevel::Error, target, message, None, error));
    }

    pub fn warn(&self, target: &str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Warn, target, message, data, None));
    }

    pub fn info(&self, target: &str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Info, target, message, data, None));
    }

    pub fn debug(&self, target: &str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Debug, target, message, data, None));
    }

    pub fn trace(&self, target: &str, message: &str, data: Option<serde_json::Value>) {
        self.write(&Self::entry(LogLevel::Trace, target, message, data, None));
    }

    /// Log a ledger movement with personal fields redacted
    pub fn ledger(&self, action: &str, data: &serde_json::Value) {
        let redacted = redact_sensitive_data(data.clone());
        self.write(&Self::entry(LogLevel::Info, "LEDGER", action, Some(redacted), None));
    }
}

/// Redact personal and secret fields from JSON
pub fn redact_sensitive_data(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => {
            for (key, val) in map.iter_mut() {
                let key = key.to_lowercase();
                if key.contains("phone")
                    || key.contains("secret")
                    || key.contains("password")
                    || key.contains("token")
                {
                    *val = serde_json::Value::String("***REDACTED***".to_string());
                } else {
                    *val = redact_sensitive_data(val.take());
                }
            }
            serde_json::Value::Object(map)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(redact_sensitive_data).collect())
        }
        _ => value,
    }
}

/// Global logger instance
static GLOBAL_LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

/// Initialize the global logger
pub fn init_global_logger(app_data_dir: &Path, config: LoggerConfig) -> Result<(), String> {
    let logger = Logger::init(app_data_dir, config)?;

    GLOBAL_LOGGER
        .set(Mutex::new(logger))
        .map_err(|_| "Logger already initialized")?;

    Ok(())
}

/// Get the global logger instance
pub fn get_logger() -> Option<&'static Mutex<Logger>> {
    GLOBAL_LOGGER.get()
}

#[macro_export]
macro_rules! log_error {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.error($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $err:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.error($target, $msg, Some(&$err));
            }
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.warn($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.warn($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.info($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.info($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($target:expr, $msg:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.debug($target, $msg, None);
            }
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                let opt_data: ::std::option::Option<serde_json::Value> = ::std::option::Option::Some($data);
                l.debug($target, $msg, opt_data);
            }
        }
    };
}

#[macro_export]
macro_rules! log_ledger {
    ($action:expr, $data:expr) => {
        if let Some(logger) = $crate::logger::get_logger() {
            if let Ok(l) = logger.lock() {
                l.ledger($action, $data);
            }
        }
    };
}
