use std::fmt::Display;
use std::path::{Path, PathBuf};

use derive_builder::UninitializedFieldError;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionFailure {
    Timeout,
    Other,
}

impl Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "Timeout"),
            Self::Other => write!(f, "Error"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ManagerError {
    #[error("Failed to load config from {path:?}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Database configuration is missing {key:?}")]
    MissingConfiguration { key: String },

    #[error("Failed to connect to database: {kind} - {error}")]
    Connection { kind: ConnectionFailure, error: String },

    #[error("Driver-specific error: {driver_name}: {error:?}")]
    Driver { driver_name: String, error: String },
}

impl ManagerError {
    pub fn config_load(path: impl AsRef<Path>, reason: impl Display) -> Self {
        Self::ConfigLoad { path: path.as_ref().to_path_buf(), reason: reason.to_string() }
    }

    pub fn missing(key: impl AsRef<str>) -> Self {
        Self::MissingConfiguration { key: key.as_ref().to_string() }
    }

    pub fn timeout(error: impl Display) -> Self {
        Self::Connection { kind: ConnectionFailure::Timeout, error: error.to_string() }
    }

    pub fn connection(error: impl Display) -> Self {
        Self::Connection { kind: ConnectionFailure::Other, error: error.to_string() }
    }

    pub fn driver(driver: impl AsRef<str>, error: impl Display) -> Self {
        Self::Driver { driver_name: driver.as_ref().to_string(), error: error.to_string() }
    }

    /// `true` for connection failures caused by the connect/ping budget running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Connection { kind: ConnectionFailure::Timeout, .. })
    }
}

impl From<UninitializedFieldError> for ManagerError {
    fn from(value: UninitializedFieldError) -> Self {
        Self::missing(value.field_name())
    }
}

pub type MResult<T> = Result<T, ManagerError>;
