//! Renderer port: Trait for turning a composed report into document bytes.

use crate::domain::ClinicalReport;

/// Error type for report rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Font error: {0}")]
    Font(String),

    #[error("Document serialization failed: {0}")]
    Serialization(String),
}

/// Renders a [`ClinicalReport`] into a finished document.
pub trait ReportRenderer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Render the report.
    ///
    /// # Errors
    /// Returns `RenderError` if the document cannot be produced.
    fn render(&self, report: &ClinicalReport) -> Result<Vec<u8>, RenderError>;
}
