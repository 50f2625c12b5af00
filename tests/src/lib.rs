//! # Preservation Vault Test Suite
//!
//! Cross-crate scenarios driven through the real adapters: filesystem
//! packages under a temp dir, the in-memory catalog, and the in-memory
//! object store.
//!
//! ## Structure
//!
//! ```text
//! tests/src/integration/
//! ├── support.rs            # Shared fixtures: packages on disk, seeding
//! ├── version_scenarios.rs  # Version reconciler end to end
//! ├── fixity_scenarios.rs   # Fixity walk end to end
//! ├── replica_scenarios.rs  # Replica audit and part delivery
//! └── runtime_pipeline.rs   # Scanner -> worker pool -> reporter
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pv-tests
//! cargo test -p pv-tests integration::version_scenarios
//! ```

pub mod integration;
