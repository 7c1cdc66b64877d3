//! Error types for GatiPlan

use thiserror::Error;

/// GatiPlan error type
#[derive(Error, Debug)]
pub enum GatiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for GatiError {
    fn from(e: toml::de::Error) -> Self {
        GatiError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatiError>;
