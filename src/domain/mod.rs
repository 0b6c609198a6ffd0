//! Domain layer: Core business types and logic.
//!
//! Pure Rust types with no I/O. Encoding, alignment, risk interpretation and
//! report composition all live here.

mod diagnosis;
pub mod features;
pub(crate) mod patient;
pub mod report;

pub use diagnosis::{Outcome, PredictionResult, RiskLevel};
pub use features::{encode, FeatureSchema, FeatureVector, SparseFeatures};
pub use patient::{ChestPainType, PatientRecord, Sex, Thalassemia};
pub use report::ClinicalReport;
