//! Cross-crate audit scenarios over the real adapters.

pub mod support;

#[cfg(test)]
mod fixity_scenarios;
#[cfg(test)]
mod replica_scenarios;
#[cfg(test)]
mod runtime_pipeline;
#[cfg(test)]
mod version_scenarios;
