//! scikit-learn adapter: Evaluates estimators exported as JSON.
//!
//! The training pipeline dumps fitted estimators with their raw parameters:
//! `StandardScaler` as `mean_`/`scale_`, forests as the flat `tree_` arrays of
//! each member, logistic regression as `coef_`/`intercept_`. This module
//! evaluates them with the same arithmetic scikit-learn uses for `transform`,
//! `predict` and `predict_proba`.

use serde::{Deserialize, Serialize};

use crate::ports::{Classifier, ModelError, Scaler};

/// Marker for a leaf in the flat `children_left`/`children_right` arrays.
pub const TREE_LEAF: i64 = -1;

fn check_len(features: &[f64], expected: usize) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::DimensionMismatch {
            got: features.len(),
            expected,
        });
    }
    Ok(())
}

/// Structural problem found while validating an exported estimator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidEstimator(pub String);

fn invalid(msg: impl Into<String>) -> InvalidEstimator {
    InvalidEstimator(msg.into())
}

fn check_binary(classes: &[i64]) -> Result<(), InvalidEstimator> {
    if classes.len() != 2 {
        return Err(invalid(format!(
            "expected a binary classifier, got {} classes",
            classes.len()
        )));
    }
    if classes[0] == classes[1] {
        return Err(invalid("class labels must be distinct"));
    }
    Ok(())
}

/// Fitted `StandardScaler`: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Check parameter consistency.
    ///
    /// # Errors
    /// Returns `InvalidEstimator` on length mismatch or non-finite parameters.
    pub fn validate(&self) -> Result<(), InvalidEstimator> {
        if self.mean.len() != self.scale.len() {
            return Err(invalid(format!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(invalid("scaler parameters must be finite"));
        }
        Ok(())
    }
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(features, self.mean.len())?;

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Zero-variance columns are left centered but unscaled.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// One fitted decision tree in scikit-learn's flat array layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions), one row per node.
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), InvalidEstimator> {
        let n = self.node_count();
        if n == 0 {
            return Err(invalid("tree has no nodes"));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(invalid("tree arrays have inconsistent lengths"));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == TREE_LEAF || right == TREE_LEAF {
                if left != right {
                    return Err(invalid(format!("node {node} has exactly one child")));
                }
                if self.value[node].len() != n_classes {
                    return Err(invalid(format!(
                        "leaf {node} has {} class weights, expected {n_classes}",
                        self.value[node].len()
                    )));
                }
                if self.value[node].iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(invalid(format!("leaf {node} has invalid class weights")));
                }
                continue;
            }

            // Children always come after their parent, which also rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(invalid(format!("node {node} has out-of-order child {child}")));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(invalid(format!("node {node} splits on unknown feature {feature}")));
            }
            if self.threshold[node].is_nan() {
                return Err(invalid(format!("node {node} has NaN threshold")));
            }
        }
        Ok(())
    }

    /// Index of the leaf reached by `features`.
    fn leaf(&self, features: &[f64]) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != TREE_LEAF {
            let x = features[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Normalized class distribution at the reached leaf.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let weights = &self.value[self.leaf(features)];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / weights.len() as f64; weights.len()]
        }
    }
}

/// Fitted `RandomForestClassifier`.
///
/// Only constructed through [`RandomForest::new`] or deserialization, both of
/// which validate the trees, so evaluation never indexes out of bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RandomForestParams")]
pub struct RandomForest {
    classes: Vec<i64>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct RandomForestParams {
    classes: Vec<i64>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RandomForestParams> for RandomForest {
    type Error = InvalidEstimator;

    fn try_from(p: RandomForestParams) -> Result<Self, Self::Error> {
        Self::new(p.classes, p.n_features, p.trees)
    }
}

impl RandomForest {
    /// # Errors
    /// Returns `InvalidEstimator` if the forest is not a well-formed binary classifier.
    pub fn new(
        classes: Vec<i64>,
        n_features: usize,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, InvalidEstimator> {
        let forest = Self {
            classes,
            n_features,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    fn validate(&self) -> Result<(), InvalidEstimator> {
        check_binary(&self.classes)?;
        if self.trees.is_empty() {
            return Err(invalid("forest has no trees"));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| invalid(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    /// Mean of the member trees' leaf distributions.
    fn proba(&self, features: &[f64]) -> Vec<f64> {
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        sum.into_iter().map(|s| s / n).collect()
    }
}

/// Fitted binary `LogisticRegression`. Validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LogisticRegressionParams")]
pub struct LogisticRegression {
    classes: Vec<i64>,
    coefficients: Vec<f64>,
    intercept: f64,
}

#[derive(Deserialize)]
struct LogisticRegressionParams {
    classes: Vec<i64>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl TryFrom<LogisticRegressionParams> for LogisticRegression {
    type Error = InvalidEstimator;

    fn try_from(p: LogisticRegressionParams) -> Result<Self, Self::Error> {
        Self::new(p.classes, p.coefficients, p.intercept)
    }
}

impl LogisticRegression {
    /// # Errors
    /// Returns `InvalidEstimator` for non-binary classes or non-finite parameters.
    pub fn new(
        classes: Vec<i64>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, InvalidEstimator> {
        let model = Self {
            classes,
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), InvalidEstimator> {
        check_binary(&self.classes)?;
        if self.coefficients.is_empty() {
            return Err(invalid("logistic regression has no coefficients"));
        }
        if self
            .coefficients
            .iter()
            .chain(std::iter::once(&self.intercept))
            .any(|v| !v.is_finite())
        {
            return Err(invalid("logistic regression parameters must be finite"));
        }
        Ok(())
    }

    fn proba(&self, features: &[f64]) -> Vec<f64> {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        let p = sigmoid(z);
        vec![1.0 - p, p]
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Any classifier the training pipeline can export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportedClassifier {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl ExportedClassifier {
    /// Check structural consistency of the exported parameters.
    ///
    /// # Errors
    /// Returns `InvalidEstimator` describing the first problem found.
    pub fn validate(&self) -> Result<(), InvalidEstimator> {
        match self {
            Self::RandomForest(forest) => forest.validate(),
            Self::LogisticRegression(lr) => lr.validate(),
        }
    }

    /// Human-readable estimator family, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random_forest",
            Self::LogisticRegression(_) => "logistic_regression",
        }
    }
}

impl Classifier for ExportedClassifier {
    fn n_features(&self) -> usize {
        match self {
            Self::RandomForest(forest) => forest.n_features,
            Self::LogisticRegression(lr) => lr.coefficients.len(),
        }
    }

    fn classes(&self) -> &[i64] {
        match self {
            Self::RandomForest(forest) => &forest.classes,
            Self::LogisticRegression(lr) => &lr.classes,
        }
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        let proba = self.predict_proba(features)?;
        let classes = self.classes();
        let best = match self {
            // Decision function > 0, i.e. strictly above one half.
            Self::LogisticRegression(_) => usize::from(proba[1] > 0.5),
            // First maximum wins, as with numpy's argmax.
            Self::RandomForest(_) => proba
                .iter()
                .enumerate()
                .fold(0, |best, (i, p)| if *p > proba[best] { i } else { best }),
        };
        Ok(classes[best])
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_len(features, self.n_features())?;
        let proba = match self {
            Self::RandomForest(forest) => forest.proba(features),
            Self::LogisticRegression(lr) => lr.proba(features),
        };
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinite(self.kind()));
        }
        Ok(proba)
    }
}
