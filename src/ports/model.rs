//! Model ports: Traits for the pre-fitted scaler and classifier.
//!
//! Both are opaque artifacts produced by an external training process. The
//! application only relies on the call contracts below.

/// Error type for model evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Feature count mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("Classifier returned no probability for class index {0}")]
    MissingClass(usize),

    #[error("Non-finite value produced by {0}")]
    NonFinite(&'static str),
}

/// Pre-fitted feature transform (e.g. standardization).
///
/// Input ordering matches the feature schema; output has the same length.
pub trait Scaler: Send + Sync {
    /// Number of features the scaler was fitted on.
    fn n_features(&self) -> usize;

    /// Transform one aligned feature row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `features` has the wrong length.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}

/// Pre-trained binary classifier.
pub trait Classifier: Send + Sync {
    /// Number of features the classifier was trained on.
    fn n_features(&self) -> usize;

    /// Class labels in probability-column order.
    fn classes(&self) -> &[i64];

    /// Predicted class label for one scaled row.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `features` has the wrong length.
    fn predict(&self, features: &[f64]) -> Result<i64, ModelError>;

    /// Per-class probabilities for one scaled row, in `classes()` order.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `features` has the wrong length.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Column of `predict_proba` holding the disease-present class (label 1).
    ///
    /// Falls back to the last column when label 1 is absent.
    fn positive_class_index(&self) -> usize {
        let classes = self.classes();
        classes
            .iter()
            .position(|&c| c == 1)
            .unwrap_or_else(|| classes.len().saturating_sub(1))
    }
}
