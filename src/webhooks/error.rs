//! Rejection reasons produced by the Module validator.
//!
//! Every variant is a user input error. The display string is what the
//! submitter sees in the admission response.

use thiserror::Error;

/// A validation failure for a Module.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    /// Both `literal` and `regexp` are set on one kernel mapping.
    #[error(
        "failed to validate kernel mappings: regexp and literal are mutually exclusive properties at kernelMappings[{index}]"
    )]
    MutuallyExclusiveSelector { index: usize },

    /// Neither `literal` nor `regexp` is set on one kernel mapping.
    #[error("failed to validate kernel mappings: regexp or literal must be set at kernelMappings[{index}]")]
    MissingSelector { index: usize },

    /// The `regexp` of a kernel mapping does not compile.
    #[error("failed to validate kernel mappings: invalid regexp at index {index}: {source}")]
    InvalidPattern {
        index: usize,
        #[source]
        source: regex::Error,
    },

    /// No image is available for a kernel mapping.
    #[error("failed to validate kernel mappings: missing {}", image_field_path(.index))]
    MissingImage { index: usize },

    /// `moduleName` and `rawArgs` are both set.
    #[error("rawArgs cannot be set when moduleName is set")]
    ConflictingLoadMode,

    /// No `moduleName`, and `rawArgs` lacks load or unload arguments.
    #[error("load and unload rawArgs must be set when moduleName is unset")]
    IncompleteRawArgs,
}

impl ValidationError {
    /// Machine-readable reason used in admission denials
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MutuallyExclusiveSelector { .. } => "MutuallyExclusiveSelector",
            ValidationError::MissingSelector { .. } => "MissingSelector",
            ValidationError::InvalidPattern { .. } => "InvalidPattern",
            ValidationError::MissingImage { .. } => "MissingImage",
            ValidationError::ConflictingLoadMode => "ConflictingLoadMode",
            ValidationError::IncompleteRawArgs => "IncompleteRawArgs",
        }
    }

    /// Index of the offending kernel mapping, if the error concerns one
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::MutuallyExclusiveSelector { index }
            | ValidationError::MissingSelector { index }
            | ValidationError::InvalidPattern { index, .. }
            | ValidationError::MissingImage { index } => Some(*index),
            ValidationError::ConflictingLoadMode | ValidationError::IncompleteRawArgs => None,
        }
    }
}

/// Path of the per-mapping image field
fn image_field_path(index: &usize) -> String {
    format!(
        "spec.moduleLoader.container.kernelMappings[{}].containerImage",
        index
    )
}

/// Result type alias for validation
pub type Result<T> = std::result::Result<T, ValidationError>;
