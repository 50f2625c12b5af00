//! # Preservation Vault Audit Subsystem
//!
//! Keeps three views of every preservation package consistent with each
//! other: the catalog rows, the bytes in the moab on a storage root, and the
//! chunked zip copies replicated to remote object-store endpoints.
//!
//! ## Architecture
//!
//! Hexagonal layout:
//!
//! - `domain/` - pure logic: the result ledger, the status transitioner,
//!   manifest parsing, the fixity walk, and replica consistency checks
//! - `ports/` - inbound audit APIs and outbound dependencies (catalog
//!   store, package store, object store, structural validator, reporter)
//! - `adapters/` - default and in-memory implementations of the outbound
//!   ports, including controllable mocks for tests
//! - `service/` - the three audit services, generic over their ports
//!
//! ## Audit Unit Contract
//!
//! One audit unit is one object crossed with one check type. Every inbound
//! operation returns an [`AuditResults`] ledger no matter what went wrong
//! inside; errors never propagate past the service boundary. All catalog
//! mutations of one unit go through a single atomic
//! [`CatalogStore::commit`](ports::outbound::CatalogStore::commit) batch,
//! and a failed commit strips the ledger of any finding that claims a
//! durable write.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::results::{AuditFinding, AuditResults, ResultCode};
pub use domain::status::{next_status, StatusDecision};
pub use service::fixity::{FixityAuditDependencies, FixityAuditService};
pub use service::replica::{ReplicaAuditConfig, ReplicaAuditDependencies, ReplicaAuditService};
pub use service::version::{VersionAuditDependencies, VersionAuditService};
