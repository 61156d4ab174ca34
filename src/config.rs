//! Process configuration.
//!
//! Values come from the environment, optionally seeded from a `.env` file.
//! Command line flags override whatever is found there.

use thiserror::Error;

use crate::domain::BoundPolicy;

pub const DEFAULT_APP_NAME: &str = "balance";
pub const DEFAULT_DATABASE_PATH: &str = "balance.db";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Where wallet events are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifierKind {
    /// JSON lines through the log
    #[default]
    Log,
    /// In-process broadcast channel, echoed by the command line
    Broadcast,
}

impl NotifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifierKind::Log => "log",
            NotifierKind::Broadcast => "broadcast",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "log" => Some(NotifierKind::Log),
            "broadcast" => Some(NotifierKind::Broadcast),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name reported in logs
    pub app_name: String,
    /// SQLite database file
    pub database_path: String,
    /// Interpretation of the tier limit bounds
    pub bounds: BoundPolicy,
    /// Event sink
    pub notifier: NotifierKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            bounds: BoundPolicy::default(),
            notifier: NotifierKind::default(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bounds = match lookup("BALANCE_BOUNDS") {
            Some(raw) => parse_bounds("BALANCE_BOUNDS", &raw)?,
            None => defaults.bounds,
        };
        let notifier = match lookup("NOTIFIER") {
            Some(raw) => parse_notifier("NOTIFIER", &raw)?,
            None => defaults.notifier,
        };

        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            bounds,
            notifier,
        })
    }

    pub fn with_database_path(mut self, path: Option<String>) -> Self {
        if let Some(path) = path {
            self.database_path = path;
        }
        self
    }

    pub fn with_bounds(mut self, bounds: Option<BoundPolicy>) -> Self {
        if let Some(bounds) = bounds {
            self.bounds = bounds;
        }
        self
    }

    pub fn with_notifier(mut self, notifier: Option<NotifierKind>) -> Self {
        if let Some(notifier) = notifier {
            self.notifier = notifier;
        }
        self
    }
}

pub fn parse_bounds(var: &str, raw: &str) -> Result<BoundPolicy, ConfigError> {
    BoundPolicy::from_str(raw).ok_or_else(|| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!(
            "'{}' is not one of exclusive, upper-inclusive, inclusive",
            raw
        ),
    })
}

pub fn parse_notifier(var: &str, raw: &str) -> Result<NotifierKind, ConfigError> {
    NotifierKind::from_str(raw).ok_or_else(|| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("'{}' is not one of log, broadcast", raw),
    })
}
