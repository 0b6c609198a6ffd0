//! Scale-then-classify over one aligned feature row.

use crate::domain::{FeatureVector, PredictionResult};
use crate::ports::{Classifier, ModelError, Scaler};

/// Run the scaler and classifier on an aligned vector.
///
/// The reported probability is the classifier's probability for the
/// disease-present class. The label comes from `predict`, so it is the
/// classifier's own decision and not a re-threshold of the probability.
///
/// # Errors
/// Returns `ModelError` if either model rejects the row or yields a
/// non-finite probability.
pub fn predict<S, C>(
    vector: &FeatureVector,
    scaler: &S,
    classifier: &C,
) -> Result<PredictionResult, ModelError>
where
    S: Scaler + ?Sized,
    C: Classifier + ?Sized,
{
    let scaled = scaler.transform(vector.values())?;
    if scaled.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NonFinite("scaler"));
    }

    let label = classifier.predict(&scaled)?;
    let proba = classifier.predict_proba(&scaled)?;

    let index = classifier.positive_class_index();
    let probability = *proba.get(index).ok_or(ModelError::MissingClass(index))?;
    if !probability.is_finite() {
        return Err(ModelError::NonFinite("classifier"));
    }

    Ok(PredictionResult::new(label, probability.clamp(0.0, 1.0)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{FeatureSchema, Outcome, RiskLevel, SparseFeatures};

    /// Identity scaler of fixed width.
    pub(crate) struct PassThrough(pub usize);

    impl Scaler for PassThrough {
        fn n_features(&self) -> usize {
            self.0
        }

        fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
            if features.len() != self.0 {
                return Err(ModelError::DimensionMismatch {
                    got: features.len(),
                    expected: self.0,
                });
            }
            Ok(features.to_vec())
        }
    }

    /// Classifier that always answers with the same label and probability.
    pub(crate) struct Fixed {
        pub n_features: usize,
        pub label: i64,
        pub probability: f64,
    }

    impl Classifier for Fixed {
        fn n_features(&self) -> usize {
            self.n_features
        }

        fn classes(&self) -> &[i64] {
            &[0, 1]
        }

        fn predict(&self, _features: &[f64]) -> Result<i64, ModelError> {
            Ok(self.label)
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![1.0 - self.probability, self.probability])
        }
    }

    fn vector(n: usize) -> FeatureVector {
        let columns = (0..n).map(|i| format!("f{i}")).collect();
        FeatureSchema::new(columns).align(&SparseFeatures::new())
    }

    #[test]
    fn test_predict_uses_positive_column() {
        let classifier = Fixed {
            n_features: 3,
            label: 1,
            probability: 0.82,
        };
        let result = predict(&vector(3), &PassThrough(3), &classifier).expect("Should predict");

        assert_eq!(result.outcome, Outcome::Detected);
        assert!((result.probability - 0.82).abs() < 1e-12);
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_label_and_probability_are_independent() {
        // The classifier may say "detected" while the positive-class probability is low.
        let classifier = Fixed {
            n_features: 2,
            label: 1,
            probability: 0.3,
        };
        let result = predict(&vector(2), &PassThrough(2), &classifier).expect("Should predict");

        assert_eq!(result.outcome, Outcome::Detected);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let classifier = Fixed {
            n_features: 4,
            label: 0,
            probability: 0.1,
        };
        let err = predict(&vector(3), &PassThrough(4), &classifier).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch {
                got: 3,
                expected: 4
            }
        ));
    }

    #[test]
    fn test_non_finite_probability_rejected() {
        let classifier = Fixed {
            n_features: 1,
            label: 0,
            probability: f64::NAN,
        };
        let err = predict(&vector(1), &PassThrough(1), &classifier).unwrap_err();
        assert!(matches!(err, ModelError::NonFinite("classifier")));
    }
}
