//! kmm-webhook library crate
//!
//! Admission validation for Kernel Module Management `Module` resources:
//! the CRD types, the validation policies and the webhook/health servers
//! that expose them.

pub mod config;
pub mod crd;
pub mod health;
pub mod webhooks;

pub use config::{Command, Config, LogFormat};
pub use health::{HEALTH_PORT, HealthState, run_health_server};
pub use webhooks::{
    AdmissionValidator, ModuleValidator, VALIDATE_MODULE_PATH, ValidationError,
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    run_webhook_server,
};
