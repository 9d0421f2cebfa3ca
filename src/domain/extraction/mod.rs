//! Field extraction dispatch

pub mod provider;

pub use provider::{ExtractionRequest, ExtractionService};

#[cfg(test)]
pub use provider::mock::MockExtractionService;
