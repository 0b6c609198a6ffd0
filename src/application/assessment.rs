//! Assessment service: Orchestrates one risk-assessment session.
//!
//! This service coordinates:
//! - Feature encoding and schema alignment
//! - Scaling and classification
//! - Report composition and rendering

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::adapters::sklearn::{ExportedClassifier, StandardScaler};
use crate::adapters::ModelArtifacts;
use crate::application::prediction::predict;
use crate::domain::{encode, ClinicalReport, FeatureSchema, PatientRecord, PredictionResult};
use crate::ports::{Classifier, ReportRenderer, Scaler};
use crate::HeartverseError;

/// A rendered report, ready to be offered to the caller.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    /// `"{name}_heart_report.pdf"`
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub result: PredictionResult,
}

/// Parse one intake-form submission from JSON.
///
/// # Errors
/// Returns `HeartverseError::Serialization` for malformed JSON or missing fields.
pub fn read_record<Rd: std::io::Read>(reader: Rd) -> Result<PatientRecord, HeartverseError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Service for running risk assessments.
///
/// Models are loaded once and shared read-only; one service instance can serve
/// any number of sessions, concurrently if needed.
pub struct AssessmentService<S, C, R>
where
    S: Scaler + ?Sized,
    C: Classifier + ?Sized,
    R: ReportRenderer + ?Sized,
{
    schema: Arc<FeatureSchema>,
    scaler: Arc<S>,
    classifier: Arc<C>,
    renderer: Arc<R>,
}

impl<S, C, R> Clone for AssessmentService<S, C, R>
where
    S: Scaler + ?Sized,
    C: Classifier + ?Sized,
    R: ReportRenderer + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            scaler: Arc::clone(&self.scaler),
            classifier: Arc::clone(&self.classifier),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<R> AssessmentService<StandardScaler, ExportedClassifier, R>
where
    R: ReportRenderer + ?Sized,
{
    /// Build a service over a loaded model bundle.
    pub fn from_artifacts(artifacts: ModelArtifacts, renderer: Arc<R>) -> Self {
        let ModelArtifacts {
            schema,
            scaler,
            classifier,
            verified,
        } = artifacts;
        tracing::debug!(
            "Assessment service using {} artifacts",
            if verified { "signed" } else { "unsigned" }
        );
        Self::new(Arc::new(schema), Arc::new(scaler), Arc::new(classifier), renderer)
    }
}

impl<S, C, R> AssessmentService<S, C, R>
where
    S: Scaler + ?Sized,
    C: Classifier + ?Sized,
    R: ReportRenderer + ?Sized,
{
    /// Create a new assessment service.
    pub fn new(
        schema: Arc<FeatureSchema>,
        scaler: Arc<S>,
        classifier: Arc<C>,
        renderer: Arc<R>,
    ) -> Self {
        Self {
            schema,
            scaler,
            classifier,
            renderer,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encode, align and classify one record.
    ///
    /// # Errors
    /// Returns `HeartverseError::Model` if the models reject the row.
    pub fn evaluate(&self, record: &PatientRecord) -> Result<PredictionResult, HeartverseError> {
        for warning in record.range_warnings() {
            tracing::warn!("Input outside expected range: {}", warning);
        }

        tracing::debug!("Step 1: Encoding categorical fields...");
        let sparse = encode(record);

        tracing::debug!("Step 2: Aligning {} encoded columns to schema...", sparse.len());
        let vector = self.schema.align(&sparse);

        tracing::debug!("Step 3: Scaling and classifying {} features...", vector.len());
        let result = predict(&vector, self.scaler.as_ref(), self.classifier.as_ref())?;

        tracing::info!(
            "Prediction complete: outcome={}, confidence={}, risk={}",
            result.outcome.label(),
            result.confidence_percent(),
            result.risk_level
        );
        Ok(result)
    }

    /// Run the full session: classify the record and render its report.
    ///
    /// # Errors
    /// Returns `HeartverseError` if classification or rendering fails.
    pub fn assess(
        &self,
        record: &PatientRecord,
        generated_on: NaiveDateTime,
    ) -> Result<ReportArtifact, HeartverseError> {
        let result = self.evaluate(record)?;

        tracing::debug!("Step 4: Composing and rendering report...");
        let report = ClinicalReport::compose(record, &result, generated_on);
        let bytes = self.renderer.render(&report)?;

        Ok(ReportArtifact {
            file_name: report.file_name(),
            content_type: self.renderer.content_type(),
            bytes,
            result,
        })
    }
}
