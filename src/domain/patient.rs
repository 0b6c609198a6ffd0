//! Patient record types for heart disease risk assessment.
//!
//! Field names on the wire follow the UCI heart disease dataset columns the
//! classifier was trained on (`trestbps`, `chol`, `thalch`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One submission from the intake form.
///
/// Records are never validated on construction: out-of-range numbers and
/// unrecognised category labels are carried through to encoding as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Free-text patient name (used in the report header and file name)
    #[serde(default)]
    pub name: String,

    /// Age in years
    pub age: i64,

    /// Resting blood pressure in mmHg
    #[serde(rename = "trestbps")]
    pub resting_bp: f64,

    /// Serum cholesterol in mg/dL
    #[serde(rename = "chol")]
    pub cholesterol: f64,

    /// Maximum heart rate achieved in bpm
    #[serde(rename = "thalch")]
    pub max_heart_rate: f64,

    /// ST depression induced by exercise relative to rest
    #[serde(rename = "oldpeak")]
    pub st_depression: f64,

    /// Number of major vessels colored by fluoroscopy (0-3)
    #[serde(rename = "ca")]
    pub major_vessels: i64,

    pub sex: Sex,

    #[serde(rename = "cp")]
    pub chest_pain: ChestPainType,

    pub thal: Thalassemia,
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A label outside the trained vocabulary, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Every label the form offers, in display order.
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            /// The display label, which is also the one-hot column suffix.
            #[must_use]
            pub fn label(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Other(raw) => raw,
                }
            }

            /// Whether the value is one of the fixed form options.
            #[must_use]
            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match raw.as_str() {
                    $($label => Self::$variant,)+
                    _ => Self::Other(raw),
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::from(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(raw) => raw,
                    known => known.label().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical! {
    /// Biological sex as captured by the form.
    Sex {
        Male => "Male",
        Female => "Female",
    }
}

categorical! {
    /// Chest pain presentation.
    ChestPainType {
        TypicalAngina => "typical angina",
        AtypicalAngina => "atypical angina",
        NonAnginal => "non-anginal",
        Asymptomatic => "asymptomatic",
    }
}

categorical! {
    /// Thalassemia stress-test result. "reversable" is the dataset's spelling.
    Thalassemia {
        Normal => "normal",
        FixedDefect => "fixed defect",
        ReversableDefect => "reversable defect",
    }
}

impl PatientRecord {
    /// Soft plausibility hints for the numeric fields.
    ///
    /// These never block a submission; callers log them.
    #[must_use]
    pub fn range_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(1..=120).contains(&self.age) {
            warnings.push(format!("Age {} outside [1, 120]", self.age));
        }
        if self.resting_bp < 0.0 {
            warnings.push(format!("Resting blood pressure {} is negative", self.resting_bp));
        }
        if self.cholesterol < 0.0 {
            warnings.push(format!("Cholesterol {} is negative", self.cholesterol));
        }
        if self.max_heart_rate < 0.0 {
            warnings.push(format!("Max heart rate {} is negative", self.max_heart_rate));
        }
        if !(0..=3).contains(&self.major_vessels) {
            warnings.push(format!("Major vessel count {} outside [0, 3]", self.major_vessels));
        }
        if !self.sex.is_known() {
            warnings.push(format!("Unrecognised sex '{}'", self.sex));
        }
        if !self.chest_pain.is_known() {
            warnings.push(format!("Unrecognised chest pain type '{}'", self.chest_pain));
        }
        if !self.thal.is_known() {
            warnings.push(format!("Unrecognised thalassemia result '{}'", self.thal));
        }

        warnings
    }
}
