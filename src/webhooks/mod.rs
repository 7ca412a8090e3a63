//! Webhook module for validating Module admission requests.
//!
//! - `validator`: the `AdmissionValidator` hooks and `ModuleValidator`
//! - `policies`: kernel mapping and modprobe rules, run in order
//! - `error`: rejection reasons
//! - `server`: axum/TLS transport that decodes AdmissionReviews

pub mod error;
pub mod policies;
mod server;
pub mod validator;

pub use error::ValidationError;
pub use policies::{ValidationResult, validate_all};
pub use server::{
    VALIDATE_MODULE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError,
    WebhookState, create_webhook_router, review_request, run_webhook_server, validate_module,
};
pub use validator::{AdmissionValidator, ModuleValidator};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
