//! Profile loading and binding errors

use super::template::TemplateError;
use crate::inputs::InputError;
use crate::model::FieldPathError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile {path} is {size} bytes, exceeding the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Failed to parse profile: {reason}")]
    Parse { reason: String },

    #[error("Control '{control}': impact {impact} is outside [0, 1]")]
    InvalidImpact { control: String, impact: f64 },

    #[error("Duplicate control name '{control}'")]
    DuplicateControl { control: String },

    #[error("Profile declares {count} controls, more than the {limit} allowed")]
    TooManyControls { count: usize, limit: usize },

    #[error("Control '{control}', resource {resource}, expectation {index}: {reason}")]
    InvalidExpectation {
        control: String,
        resource: usize,
        index: usize,
        reason: String,
    },

    #[error("Control '{control}': invalid field path: {source}")]
    InvalidFieldPath {
        control: String,
        #[source]
        source: FieldPathError,
    },

    #[error("Control '{control}' references undeclared input '{input}'")]
    UndeclaredInput { control: String, input: String },

    #[error("Control '{control}': for_each input '{input}' must be a mapping or sequence, got {actual}")]
    InvalidForEach {
        control: String,
        input: String,
        actual: String,
    },

    #[error("Control '{control}': {source}")]
    Template {
        control: String,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    Input(#[from] InputError),
}

impl ProfileError {
    /// Configuration errors caused by the supplied inputs rather than the profile text
    pub fn is_input_error(&self) -> bool {
        matches!(self, ProfileError::Input(_))
    }
}
