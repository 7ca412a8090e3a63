//! Custom Resource Definitions (CRDs) for kmm-webhook.
//!
//! - `Module`: Declare how a kernel module is loaded on nodes per kernel version

mod module;

pub use module::*;
