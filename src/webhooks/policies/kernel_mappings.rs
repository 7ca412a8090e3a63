//! Kernel mapping validation policy.
//!
//! Validates, per mapping and in declaration order:
//! - Exactly one of `literal` and `regexp` is set
//! - `regexp` compiles
//! - An image is available from the mapping or the container default
//!
//! Stops at the first offending mapping.

use super::pattern;
use crate::crd::{KernelMapping, ModuleLoaderContainerSpec};
use crate::webhooks::error::{Result, ValidationError};

/// Validate every kernel mapping of the module loader container
pub fn validate(container: &ModuleLoaderContainerSpec) -> Result<()> {
    for (index, mapping) in container.kernel_mappings.iter().enumerate() {
        validate_mapping(index, mapping, &container.container_image)?;
    }
    Ok(())
}

fn validate_mapping(index: usize, mapping: &KernelMapping, default_image: &str) -> Result<()> {
    let has_literal = !mapping.literal.is_empty();
    let has_regexp = !mapping.regexp.is_empty();

    if has_literal && has_regexp {
        return Err(ValidationError::MutuallyExclusiveSelector { index });
    }

    if !has_literal && !has_regexp {
        return Err(ValidationError::MissingSelector { index });
    }

    // An empty pattern compiles to a match-all and is accepted
    pattern::compile(&mapping.regexp)
        .map_err(|source| ValidationError::InvalidPattern { index, source })?;

    if default_image.is_empty() && mapping.container_image.is_empty() {
        return Err(ValidationError::MissingImage { index });
    }

    Ok(())
}
