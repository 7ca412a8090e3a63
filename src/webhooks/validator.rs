//! Module validator and the admission-event interface it implements.
//!
//! The validator is stateless: every call is a pure function of the
//! submitted object. Logging goes through the span handed in at
//! construction and never influences the verdict.

use kube::ResourceExt;
use tracing::{Span, info, info_span};

use crate::crd::Module;
use crate::webhooks::error::Result;
use crate::webhooks::policies::validate_all;

/// Admission lifecycle hooks for a resource kind.
///
/// Transports decode the request, pick the hook matching the operation
/// and turn the returned error into a denial.
pub trait AdmissionValidator<K> {
    /// Validate a resource about to be created
    fn validate_create(&self, resource: &K) -> Result<()>;

    /// Validate the new state of a resource about to be updated
    fn validate_update(&self, old: &K, new: &K) -> Result<()>;

    /// Validate a resource about to be deleted
    fn validate_delete(&self, resource: &K) -> Result<()>;
}

/// Validates Module create and update requests.
#[derive(Clone, Debug)]
pub struct ModuleValidator {
    span: Span,
}

impl Default for ModuleValidator {
    fn default() -> Self {
        Self::new(info_span!("module-resource"))
    }
}

impl ModuleValidator {
    /// Create a validator that logs inside `span`
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    fn log_operation(&self, operation: &str, module: &Module) {
        let name = module.name_any();
        let namespace = module.namespace().unwrap_or_default();
        self.span.in_scope(|| {
            info!(operation, name = %name, namespace = %namespace, "Validating Module");
        });
    }
}

impl AdmissionValidator<Module> for ModuleValidator {
    fn validate_create(&self, resource: &Module) -> Result<()> {
        self.log_operation("create", resource);
        validate_all(&resource.spec)
    }

    /// The previous object is not consulted: any valid target state is accepted.
    fn validate_update(&self, _old: &Module, new: &Module) -> Result<()> {
        self.log_operation("update", new);
        validate_all(&new.spec)
    }

    fn validate_delete(&self, _resource: &Module) -> Result<()> {
        Ok(())
    }
}
