//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid quantity '{value}': {message}")]
    InvalidQuantity { value: String, message: String },

    #[error("failed to serialize as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// Shorthand for an `InvalidConfig` with a formatted message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
