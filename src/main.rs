//! kmm-webhook - Validating admission webhook for KMM Module resources.
//!
//! This is the main entry point that:
//! - Parses configuration from flags and environment
//! - Initializes structured logging
//! - Starts the health server and, when certificates exist, the webhook server
//! - Handles graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::CustomResourceExt;
use tokio::signal;
use tracing::{error, info, info_span};

use kmm_webhook::crd::Module;
use kmm_webhook::{
    Command, Config, HealthState, LogFormat, ModuleValidator, WebhookState, run_health_server,
    run_webhook_server,
};

/// Grace period for in-flight admission requests to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    if config.command == Some(Command::PrintCrd) {
        println!("{}", serde_json::to_string_pretty(&Module::crd())?);
        return Ok(());
    }

    init_tracing(config.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting kmm-webhook");

    let health_state = Arc::new(HealthState::new());

    // Start health server immediately so liveness probes pass during startup
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Without certificates there is nothing to serve; stay alive but not ready
    let webhook_handle = if config.tls_available() {
        info!(
            cert_path = %config.cert_path.display(),
            "TLS certificates found, starting webhook server"
        );
        let state = Arc::new(WebhookState::new(
            ModuleValidator::new(info_span!("module-resource")),
            Some(health_state.clone()),
        ));
        health_state.set_ready(true).await;

        let config = config.clone();
        Some(tokio::spawn(async move {
            if let Err(e) =
                run_webhook_server(state, config.webhook_port, &config.cert_path, &config.key_path)
                    .await
            {
                error!("Webhook server error: {}", e);
            }
        }))
    } else {
        info!(
            cert_path = %config.cert_path.display(),
            key_path = %config.key_path.display(),
            "Webhook certificates not found, webhook server disabled"
        );
        None
    };

    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        result = async {
            match webhook_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission requests
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` adds to the default directives.
fn init_tracing(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("kmm_webhook=info".parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
