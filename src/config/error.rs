//! Errors raised while locating, merging and checking settings

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required configuration file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Configuration path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    /// The merged sources do not form valid `Settings`.
    #[error("Failed to deserialize configuration: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// A `CAMPUS_*` variable holds a value outside its accepted set.
    #[error("Invalid {var} value '{value}'. Valid values are: {expected}")]
    InvalidEnvVar {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(
        "{dir_var} and {file_var} cannot both be set. Use {dir_var} for layered \
         configuration or {file_var} for a single configuration file."
    )]
    ConflictingSources {
        dir_var: &'static str,
        file_var: &'static str,
    },

    /// A source could not be read or merged.
    #[error("Failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Dotted settings key the error is about, when it names one.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::ValidationError { field, .. } => Some(field.as_str()),
            ConfigError::InvalidEnvVar { var, .. } => Some(*var),
            _ => None,
        }
    }
}
