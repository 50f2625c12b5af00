//! Pure domain logic for the three auditors.
//!
//! Nothing in this module performs I/O directly; filesystem and catalog
//! access always arrives through a port passed in by the caller.

pub mod entities;
pub mod fixity;
pub mod manifests;
pub mod replica;
pub mod results;
pub mod status;
