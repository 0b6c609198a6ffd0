//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats:
//! - `artifacts`: model bundle loading and signature verification
//! - `sklearn`: scikit-learn estimators exported as JSON
//! - `pdf`: printpdf report rendering
//! - `output`: atomic report persistence
//! - `sanitize`: identifier filtering for logs

pub mod artifacts;
pub mod output;
pub mod pdf;
pub mod sanitize;
pub mod sklearn;

pub use artifacts::{ArtifactError, ArtifactPolicy, ModelArtifacts};
pub use output::OutputError;
