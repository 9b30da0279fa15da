//! Error types for the conversion engine
//!
//! Conversion is all-or-nothing per invocation; every error here is fatal
//! to the current run and deterministic, so there is nothing to retry.

use kkpmig_core::CoreError;
use thiserror::Error;

/// Converter error
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to parse {context}: {source}")]
    Yaml {
        context: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{field} is not valid base64: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("cannot parse '{value}' as an integer")]
    InvalidNumber { value: String },

    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ConvertError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
