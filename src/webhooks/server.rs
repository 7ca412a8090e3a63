//! Admission webhook server.
//!
//! Provides the HTTP endpoint the API server calls for Module admission.
//!
//! To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration pointing at
//!    `/validate-kmm-sigs-x-k8s-io-v1beta1-module` for CREATE and UPDATE
//! 3. Mount the TLS certificate secret to the pod at /etc/webhook/certs/
//!
//! The webhook server starts automatically when certificates are present.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, body::Bytes, extract::State, http::StatusCode, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use kube::Resource;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::crd::Module;
use crate::health::HealthState;
use crate::webhooks::policies::ValidationResult;
use crate::webhooks::validator::{AdmissionValidator, ModuleValidator};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;
/// Path registered for Module validation
pub const VALIDATE_MODULE_PATH: &str = "/validate-kmm-sigs-x-k8s-io-v1beta1-module";

/// Shared state for webhook handlers
pub struct WebhookState {
    pub validator: ModuleValidator,
    pub health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(validator: ModuleValidator, health: Option<Arc<HealthState>>) -> Self {
        Self { validator, health }
    }
}

/// Create a denial response. The message reaches the submitter verbatim;
/// the machine-readable reason goes in status.reason.
fn deny_with_reason<T: Resource>(
    request: &AdmissionRequest<T>,
    message: &str,
    reason: &str,
) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request).deny(message);
    response.result.reason = reason.to_string();
    response
}

/// Respond to a body that is not a usable AdmissionReview
fn invalid_review(message: String) -> (StatusCode, Json<AdmissionReview<DynamicObject>>) {
    error!(error = %message, "Failed to extract admission request");
    (
        StatusCode::BAD_REQUEST,
        Json(AdmissionResponse::invalid(message).into_review()),
    )
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "create",
        Operation::Update => "update",
        Operation::Delete => "delete",
        Operation::Connect => "connect",
    }
}

/// Decide an admission request by dispatching to the matching validator hook.
pub fn review_request<V>(validator: &V, request: &AdmissionRequest<Module>) -> ValidationResult
where
    V: AdmissionValidator<Module>,
{
    match request.operation {
        Operation::Create => match &request.object {
            Some(object) => validator.validate_create(object).into(),
            None => ValidationResult::denied("InvalidRequest", "Missing object in request"),
        },
        Operation::Update => match &request.object {
            // The old object is never consulted, so its absence is not an error
            Some(object) => {
                let old = request.old_object.as_ref().unwrap_or(object);
                validator.validate_update(old, object).into()
            }
            None => ValidationResult::denied("InvalidRequest", "Missing object in request"),
        },
        Operation::Delete => match request.old_object.as_ref().or(request.object.as_ref()) {
            Some(object) => validator.validate_delete(object).into(),
            None => ValidationResult::allowed(),
        },
        Operation::Connect => ValidationResult::allowed(),
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATE_MODULE_PATH, post(validate_module))
        .with_state(state)
}

/// Decode the AdmissionReview envelope without interpreting the objects
fn decode_envelope(body: &[u8]) -> Result<AdmissionRequest<DynamicObject>, String> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let request: AdmissionRequest<DynamicObject> =
        review.try_into().map_err(|e| format!("{}", e))?;
    Ok(request)
}

/// Decode the AdmissionReview with its objects typed as Module
fn decode_module_request(body: &[u8]) -> Result<AdmissionRequest<Module>, String> {
    let review: AdmissionReview<Module> =
        serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let request: AdmissionRequest<Module> = review.try_into().map_err(|e| format!("{}", e))?;
    Ok(request)
}

/// Module admission webhook handler
///
/// The envelope is decoded first so that a Module which fails to decode
/// can still be denied against the request uid.
pub async fn validate_module(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> (StatusCode, Json<AdmissionReview<DynamicObject>>) {
    let envelope: AdmissionRequest<DynamicObject> = match decode_envelope(&body) {
        Ok(req) => req,
        Err(e) => return invalid_review(format!("Invalid AdmissionReview: {}", e)),
    };

    let request: AdmissionRequest<Module> = match decode_module_request(&body) {
        Ok(req) => req,
        Err(e) => {
            let message = format!("failed to decode Module: {}", e);
            warn!(uid = %envelope.uid, message = %message, "Admission request denied");
            return (
                StatusCode::OK,
                Json(deny_with_reason(&envelope, &message, "InvalidRequest").into_review()),
            );
        }
    };

    let uid = &request.uid;
    let operation = operation_label(&request.operation);
    debug!(
        uid = %uid,
        operation,
        namespace = ?request.namespace,
        name = %request.name,
        "Processing admission request"
    );

    let started = Instant::now();
    let result = review_request(&state.validator, &request);

    if let Some(health) = &state.health {
        health.metrics.record_admission(
            operation,
            result.allowed,
            started.elapsed().as_secs_f64(),
        );
    }

    if !result.allowed {
        let reason = result
            .reason
            .unwrap_or_else(|| "ValidationFailed".to_string());
        let message = result
            .message
            .unwrap_or_else(|| "Validation failed".to_string());
        warn!(uid = %uid, reason = %reason, message = %message, "Admission request denied");
        return (
            StatusCode::OK,
            Json(deny_with_reason(&request, &message, &reason).into_review()),
        );
    }

    info!(uid = %uid, operation, "Admission request allowed");
    (
        StatusCode::OK,
        Json(AdmissionResponse::from(&request).into_review()),
    )
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server with TLS
///
/// Binds to `0.0.0.0:<port>` and serves the Module validation endpoint.
///
/// # Arguments
/// * `state` - Validator and optional health state shared by handlers
/// * `port` - Port to listen on
/// * `cert_path` - Path to TLS certificate file (PEM format)
/// * `key_path` - Path to TLS private key file (PEM format)
pub async fn run_webhook_server(
    state: Arc<WebhookState>,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookError> {
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, path = VALIDATE_MODULE_PATH, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
