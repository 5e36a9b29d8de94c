//! Service settings.
//!
//! Settings are loaded once from `APP_`-prefixed environment variables at
//! startup and shared read-only for the lifetime of the process. The database
//! URL is redacted in Debug output.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix shared by all service environment variables.
pub const ENV_PREFIX: &str = "APP_";

/// Default service name.
pub const DEFAULT_APP_NAME: &str = "devops-app";

/// Default deployment environment.
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default host printed in the startup banner.
pub const DEFAULT_DISPLAY_HOST: &str = "localhost";

/// Log verbosity accepted by `APP_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!(
                "expected one of DEBUG, INFO, WARN, ERROR, got '{}'",
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Process-wide settings.
#[derive(Clone)]
pub struct Settings {
    /// Service name, reported by `GET /`.
    pub app_name: String,

    /// Deployment environment label (e.g. "local", "prod").
    pub environment: String,

    /// Log verbosity for the service crate.
    pub log_level: LogLevel,

    /// Listening port (1-65535).
    pub port: u16,

    /// Optional downstream database URL. Accepted but never probed.
    pub db_url: Option<String>,

    /// Host shown in the "open your browser" startup log line.
    pub display_host: String,

    /// Seconds to wait after a shutdown signal before the server stops.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts the database URL.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("app_name", &self.app_name)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("port", &self.port)
            .field("db_url", &self.db_url.as_ref().map(|_| "[REDACTED]"))
            .field("display_host", &self.display_host)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid port configuration: {0}")]
    InvalidPort(String),

    #[error("Invalid log level configuration: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let app_name = prefixed(vars, "APP_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let environment = prefixed(vars, "ENV")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let log_level = match prefixed(vars, "LOG_LEVEL") {
            Some(value) => value.parse().map_err(|e| {
                ConfigError::InvalidLogLevel(format!("{}LOG_LEVEL: {}", ENV_PREFIX, e))
            })?,
            None => LogLevel::default(),
        };

        let port = if let Some(value_str) = prefixed(vars, "PORT") {
            let value: u16 = value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidPort(format!(
                    "{}PORT must be an integer between 1 and 65535, got '{}': {}",
                    ENV_PREFIX, value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidPort(format!(
                    "{}PORT must be an integer between 1 and 65535, got 0",
                    ENV_PREFIX
                )));
            }

            value
        } else {
            DEFAULT_PORT
        };

        let db_url = prefixed(vars, "DB_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned();

        let display_host = vars
            .get("DISPLAY_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISPLAY_HOST.to_string());

        let drain_seconds = match prefixed(vars, "DRAIN_SECONDS") {
            Some(value_str) => value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "{}DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    ENV_PREFIX, value_str, e
                ))
            })?,
            None => 0,
        };

        Ok(Settings {
            app_name,
            environment,
            log_level,
            port,
            db_url,
            display_host,
            drain_seconds,
        })
    }
}

fn prefixed<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    vars.get(&format!("{}{}", ENV_PREFIX, name))
}
