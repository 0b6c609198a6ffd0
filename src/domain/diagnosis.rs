//! Prediction result types.
//!
//! Represents the classifier output after interpretation: binary outcome,
//! positive-class probability and the derived risk tier.

use serde::{Deserialize, Serialize};

/// Risk tier for heart disease, derived from the positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// p <= 0.4
    Low,
    /// 0.4 < p <= 0.75
    Moderate,
    /// p > 0.75
    High,
}

impl RiskLevel {
    /// Probability strictly above which a result is High risk.
    pub const HIGH_THRESHOLD: f64 = 0.75;

    /// Probability strictly above which a result is at least Moderate risk.
    pub const MODERATE_THRESHOLD: f64 = 0.4;

    /// Map a probability onto the fixed threshold ladder.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > Self::HIGH_THRESHOLD {
            Self::High
        } else if probability > Self::MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Binary classifier outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    NotDetected,
    Detected,
}

impl Outcome {
    /// Interpret a raw class label. Only label 1 means disease present.
    #[must_use]
    pub fn from_label(label: i64) -> Self {
        if label == 1 {
            Self::Detected
        } else {
            Self::NotDetected
        }
    }

    /// Class label as the model encodes it.
    #[must_use]
    pub fn label(&self) -> i64 {
        match self {
            Self::NotDetected => 0,
            Self::Detected => 1,
        }
    }

    /// Headline shown in the prediction block.
    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self {
            Self::NotDetected => "No Disease Detected",
            Self::Detected => "Heart Disease Detected",
        }
    }

    /// The fixed doctor's note for this outcome.
    #[must_use]
    pub fn doctor_note(&self) -> &'static str {
        match self {
            Self::NotDetected => {
                "No immediate cardiac risk detected based on current parameters. \
                 Recommend maintaining a heart-healthy lifestyle and scheduling regular checkups."
            }
            Self::Detected => {
                "This patient exhibits clinical indicators consistent with elevated cardiac risk. \
                 Immediate consultation with a cardiologist is strongly recommended. \
                 Lifestyle modifications and diagnostic follow-up are advised."
            }
        }
    }
}

/// Result of one prediction. Derived once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub outcome: Outcome,

    /// Probability of the positive class (0.0 to 1.0)
    pub probability: f64,

    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Build a result from the classifier's label and positive-class probability.
    #[must_use]
    pub fn new(label: i64, probability: f64) -> Self {
        Self {
            outcome: Outcome::from_label(label),
            probability,
            risk_level: RiskLevel::from_probability(probability),
        }
    }

    /// Probability as a two-decimal percentage, e.g. `82.34%`.
    #[must_use]
    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_probability() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.12), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.5), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.88), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.75), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.750001), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.400001), RiskLevel::Moderate);
    }

    #[test]
    fn test_outcome_from_label() {
        assert_eq!(Outcome::from_label(1), Outcome::Detected);
        assert_eq!(Outcome::from_label(0), Outcome::NotDetected);
        assert_eq!(Outcome::from_label(2), Outcome::NotDetected);
        assert_eq!(Outcome::Detected.label(), 1);
    }

    #[test]
    fn test_doctor_note_depends_on_outcome_only() {
        let low = PredictionResult::new(1, 0.05);
        let high = PredictionResult::new(1, 0.99);
        assert_eq!(low.outcome.doctor_note(), high.outcome.doctor_note());
        assert!(Outcome::Detected.doctor_note().contains("cardiologist"));
        assert!(Outcome::NotDetected
            .doctor_note()
            .starts_with("No immediate cardiac risk"));
        assert_ne!(Outcome::Detected.doctor_note(), Outcome::NotDetected.doctor_note());
    }

    #[test]
    fn test_confidence_percent() {
        assert_eq!(PredictionResult::new(1, 0.8234).confidence_percent(), "82.34%");
        assert_eq!(PredictionResult::new(0, 0.12).confidence_percent(), "12.00%");
        assert_eq!(PredictionResult::new(0, 0.0).confidence_percent(), "0.00%");
    }

    #[test]
    fn test_prediction_result_derives_risk() {
        let result = PredictionResult::new(0, 0.12);
        assert_eq!(result.outcome, Outcome::NotDetected);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }
}
