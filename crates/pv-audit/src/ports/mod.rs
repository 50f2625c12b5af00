//! Port traits: inbound audit APIs and outbound dependencies.

pub mod inbound;
pub mod outbound;
