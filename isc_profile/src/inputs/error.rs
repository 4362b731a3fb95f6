//! Input configuration errors
//!
//! Every variant names the input it concerns so the diagnostic printed
//! before aborting a run points at the offending configuration value.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Missing required input '{name}'")]
    Missing { name: String },

    #[error("Input '{name}' expected {expected}, got {actual}: {reason}")]
    InvalidValue {
        name: String,
        expected: String,
        actual: String,
        reason: String,
    },

    #[error("Input '{name}' is not declared by the profile")]
    Undeclared { name: String },

    #[error("Failed to read inputs file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse inputs file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

impl InputError {
    /// Name of the input this error concerns, if any
    pub fn input_name(&self) -> Option<&str> {
        match self {
            InputError::Missing { name }
            | InputError::InvalidValue { name, .. }
            | InputError::Undeclared { name } => Some(name),
            InputError::Io { .. } | InputError::Parse { .. } => None,
        }
    }
}
