//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use case of the application: one risk-assessment session.

mod assessment;
mod prediction;

pub use assessment::{read_record, AssessmentService, ReportArtifact};
pub use prediction::predict;
