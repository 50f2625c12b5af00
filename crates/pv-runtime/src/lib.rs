//! # Preservation Vault Runtime Library
//!
//! The operational wrapper around the audit services: configuration
//! loading, the audit job queue and worker pool, the due-audit scanner,
//! and the feature-gated S3 endpoint adapter.
//!
//! This library exposes the runtime modules for testing; the entry point
//! is the `pv-runtime` binary in `main.rs`.

pub mod config;
pub mod jobs;
#[cfg(feature = "s3")]
pub mod s3;

pub use config::{ConfigError, VaultConfig};
pub use jobs::{scan_due, spawn_workers, AuditJob, AuditKind, WorkerDeps};
