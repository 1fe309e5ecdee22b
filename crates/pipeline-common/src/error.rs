//! Error types for the pipeline stages.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Primary error type shared by every stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    // === Configuration Errors ===
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    // === Transport Errors ===
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    // === Data Errors ===
    #[error("Feature collection is empty: {0}")]
    EmptyFeatureCollection(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Failed to read data: {0}")]
    DataRead(String),

    #[error("Failed to render figure: {0}")]
    Render(String),

    // === Contract Errors ===
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Unsupported {option}: {value}")]
    UnsupportedOption { option: String, value: String },

    #[error("Unknown test: {0}")]
    UnsupportedTest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse grouping of errors, used when reporting a failed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Data,
    NotImplemented,
    Unsupported,
    Io,
}

impl PipelineError {
    /// Which part of the error taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::ConfigNotFound(_)
            | PipelineError::ConfigParse(_)
            | PipelineError::MissingKey(_)
            | PipelineError::InvalidValue { .. } => ErrorCategory::Configuration,

            PipelineError::Transport { .. }
            | PipelineError::HttpStatus { .. }
            | PipelineError::InvalidResponse { .. } => ErrorCategory::Transport,

            PipelineError::EmptyFeatureCollection(_)
            | PipelineError::Geometry(_)
            | PipelineError::DataRead(_)
            | PipelineError::Render(_) => ErrorCategory::Data,

            PipelineError::NotImplemented(_) => ErrorCategory::NotImplemented,

            PipelineError::UnsupportedOption { .. } | PipelineError::UnsupportedTest(_) => {
                ErrorCategory::Unsupported
            }

            PipelineError::Io(_) => ErrorCategory::Io,
        }
    }

    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(option: impl Into<String>, value: impl Into<String>) -> Self {
        PipelineError::UnsupportedOption {
            option: option.into(),
            value: value.into(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::DataRead(format!("JSON error: {}", err))
    }
}
