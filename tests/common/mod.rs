//! Shared helpers for kmm-webhook test suites.
