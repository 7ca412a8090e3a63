//! Command-line and environment configuration.
//!
//! Every flag can also be set through the environment variable named next
//! to it, which is how the Deployment manifest configures the pod.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::health::HEALTH_PORT;
use crate::webhooks::{WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT};

/// Validating admission webhook for KMM Module resources
#[derive(Parser, Debug, Clone)]
#[command(name = "kmm-webhook", version, about, long_about = None)]
pub struct Config {
    /// Port the TLS webhook server listens on
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = WEBHOOK_PORT)]
    pub webhook_port: u16,

    /// PEM certificate for the webhook server
    #[arg(long, env = "WEBHOOK_CERT_PATH", default_value = WEBHOOK_CERT_PATH)]
    pub cert_path: PathBuf,

    /// PEM private key for the webhook server
    #[arg(long, env = "WEBHOOK_KEY_PATH", default_value = WEBHOOK_KEY_PATH)]
    pub key_path: PathBuf,

    /// Port for /healthz, /readyz and /metrics
    #[arg(long, env = "HEALTH_PORT", default_value_t = HEALTH_PORT)]
    pub health_port: u16,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    /// Whether both TLS files are present on disk
    pub fn tls_available(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve admission requests (default)
    Serve,
    /// Print the Module CustomResourceDefinition as JSON
    PrintCrd,
}
