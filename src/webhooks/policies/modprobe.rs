//! modprobe argument validation policy.
//!
//! Validates:
//! - `moduleName` and `rawArgs` are not both set
//! - Without `moduleName`, both `rawArgs.load` and `rawArgs.unload` are set

use crate::crd::ModprobeSpec;
use crate::webhooks::error::{Result, ValidationError};

/// Validate the load mode declared by the modprobe block
pub fn validate(modprobe: &ModprobeSpec) -> Result<()> {
    let module_name_defined = !modprobe.module_name.is_empty();
    let raw_load_defined = modprobe
        .raw_args
        .as_ref()
        .is_some_and(|args| !args.load.is_empty());
    let raw_unload_defined = modprobe
        .raw_args
        .as_ref()
        .is_some_and(|args| !args.unload.is_empty());

    if module_name_defined {
        if raw_load_defined || raw_unload_defined {
            return Err(ValidationError::ConflictingLoadMode);
        }
        return Ok(());
    }

    if !raw_load_defined || !raw_unload_defined {
        return Err(ValidationError::IncompleteRawArgs);
    }

    Ok(())
}
