//! Feature encoding and schema alignment.
//!
//! A record is first expanded into a sparse column → value mapping (one hot
//! column per categorical attribute), then reindexed against the column order
//! the classifier was trained with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::patient::PatientRecord;

/// Numeric column names, in the order the intake form lists them.
pub const NUMERIC_COLUMNS: [&str; 6] = ["age", "trestbps", "chol", "thalch", "oldpeak", "ca"];

/// Categorical attribute names used as one-hot column prefixes.
pub const CATEGORICAL_ATTRIBUTES: [&str; 3] = ["sex", "cp", "thal"];

/// Sparse encoder output: only the columns this record actually produces.
pub type SparseFeatures = BTreeMap<String, f64>;

/// Name of the one-hot column for `attribute` taking `value`.
#[must_use]
pub fn one_hot_column(attribute: &str, value: &str) -> String {
    format!("{attribute}_{value}")
}

/// Expand a record into its sparse feature mapping.
///
/// Numeric fields pass through under their wire names. Each categorical field
/// contributes a single `"{attribute}_{value}"` entry set to 1.
#[must_use]
pub fn encode(record: &PatientRecord) -> SparseFeatures {
    let numeric = [
        record.age as f64,
        record.resting_bp,
        record.cholesterol,
        record.max_heart_rate,
        record.st_depression,
        record.major_vessels as f64,
    ];
    let categorical = [
        record.sex.label(),
        record.chest_pain.label(),
        record.thal.label(),
    ];

    let mut sparse: SparseFeatures = NUMERIC_COLUMNS
        .iter()
        .zip(numeric)
        .map(|(name, value)| ((*name).to_string(), value))
        .collect();

    for (attribute, value) in CATEGORICAL_ATTRIBUTES.iter().zip(categorical) {
        sparse.insert(one_hot_column(attribute, value), 1.0);
    }

    sparse
}

/// Ordered column names fixed at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reindex `sparse` to this schema.
    ///
    /// Missing columns are filled with 0 and columns the schema does not know
    /// are dropped. This never fails.
    #[must_use]
    pub fn align(&self, sparse: &SparseFeatures) -> FeatureVector {
        let values = self
            .columns
            .iter()
            .map(|column| sparse.get(column).copied().unwrap_or(0.0))
            .collect();

        let dropped: Vec<&str> = sparse
            .keys()
            .filter(|column| !self.columns.contains(*column))
            .map(String::as_str)
            .collect();
        if !dropped.is_empty() {
            tracing::debug!("Dropping {} column(s) unknown to the schema: {:?}", dropped.len(), dropped);
        }

        FeatureVector {
            columns: self.columns.clone(),
            values,
        }
    }
}

/// Dense feature values aligned 1:1 with a [`FeatureSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column, if the schema has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// View the vector as a column → value mapping again.
    #[must_use]
    pub fn to_sparse(&self) -> SparseFeatures {
        self.columns
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }
}
