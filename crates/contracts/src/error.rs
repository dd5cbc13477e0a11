//! Error taxonomy, layered by source: config / feature decode / session replay.

use thiserror::Error;

/// Unified error type shared across the workspace
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Measurement decoding =====
    /// Malformed feature frame payload
    #[error("feature decode error: {message}")]
    FeatureDecode { message: String },

    // ===== Session replay =====
    /// Malformed session record
    #[error("session parse error at line {line}: {message}")]
    SessionParse { line: usize, message: String },

    // ===== Generic =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create a configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a feature decode error
    pub fn feature_decode(message: impl Into<String>) -> Self {
        Self::FeatureDecode {
            message: message.into(),
        }
    }

    /// Create a session parse error
    pub fn session_parse(line: usize, message: impl Into<String>) -> Self {
        Self::SessionParse {
            line,
            message: message.into(),
        }
    }
}
