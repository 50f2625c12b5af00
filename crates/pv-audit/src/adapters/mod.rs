//! Default and in-memory adapters for the outbound ports.
//!
//! Production deployments swap in real database and object-store adapters
//! at the runtime layer; everything here is either a usable default (the
//! filesystem package store, the tracing reporter, the basic validator) or
//! a controllable in-memory implementation for tests.

pub mod catalog;
pub mod object_store;
pub mod packages;
pub mod reporter;
pub mod validator;

pub use catalog::InMemoryCatalog;
pub use object_store::InMemoryObjectStore;
pub use packages::FilesystemPackages;
pub use reporter::TracingReporter;
pub use validator::{BasicStructuralValidator, MockStructuralValidator};
