//! Validation policies for Module admission webhooks.
//!
//! Policies run in a fixed order and the first failure wins:
//! 1. Kernel mappings (selectors, patterns, images); patterns compile via `pattern`
//! 2. modprobe load mode (moduleName vs rawArgs)
//!
//! Policies are pure functions of the submitted spec.

pub mod kernel_mappings;
pub mod modprobe;
pub mod pattern;

use crate::crd::ModuleSpec;
use crate::webhooks::error::{Result, ValidationError};

/// Result of a validation check, as reported to the API server
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub allowed: bool,
    /// Reason for denial (if not allowed)
    pub reason: Option<String>,
    /// Detailed message (if not allowed)
    pub message: Option<String>,
}

impl ValidationResult {
    /// Create an allowed result
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
        }
    }

    /// Create a denied result
    pub fn denied(reason: &str, message: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }
    }
}

impl From<Result<()>> for ValidationResult {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::allowed(),
            Err(err) => Self::from(&err),
        }
    }
}

impl From<&ValidationError> for ValidationResult {
    fn from(err: &ValidationError) -> Self {
        Self::denied(err.reason(), &err.to_string())
    }
}

/// Run all validation policies against a Module spec
pub fn validate_all(spec: &ModuleSpec) -> Result<()> {
    let container = &spec.module_loader.container;

    kernel_mappings::validate(container)?;
    modprobe::validate(&container.modprobe)
}
