//! # HeartVerse
//!
//! Heart disease risk assessment from a short clinical intake form.
//!
//! This crate provides:
//! - One-hot encoding and schema alignment of patient records
//! - Inference with pre-trained scikit-learn models exported as JSON
//! - Risk banding and single-page PDF report generation
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (PatientRecord, features, diagnosis, report)
//! - `ports`: Trait definitions for the models and the renderer
//! - `adapters`: Concrete implementations (sklearn exports, printpdf, artifact bundle)
//! - `application`: Use cases orchestrating domain and ports

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{PatientRecord, PredictionResult, RiskLevel};

/// Result type for HeartVerse operations
pub type Result<T> = std::result::Result<T, HeartverseError>;

/// Main error type for HeartVerse
#[derive(Debug, thiserror::Error)]
pub enum HeartverseError {
    #[error("Model artifacts unavailable: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Report rendering failed: {0}")]
    Render(#[from] ports::RenderError),

    #[error("Report output failed: {0}")]
    Output(#[from] adapters::OutputError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
