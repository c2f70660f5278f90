//! Regressors evaluated in log-price space

use crate::InferenceError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trained model mapping model-ordered rows to log1p(price)
pub trait Regressor: Send + Sync + Debug {
    /// Number of columns the model was trained on
    fn n_features(&self) -> usize;

    /// One output per input row
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError>;
}

fn check_width(expected: usize, rows: &ArrayView2<'_, f64>) -> Result<(), InferenceError> {
    if rows.ncols() == expected {
        Ok(())
    } else {
        Err(InferenceError::ShapeMismatch {
            artifact: "regressor",
            expected,
            actual: rows.ncols(),
        })
    }
}

/// Serialized linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

/// Linear regressor: `rows · coefficients + intercept`
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn from_params(params: LinearParams) -> Result<Self, InferenceError> {
        if params.coefficients.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "linear model has no coefficients".to_string(),
            ));
        }
        if !params.intercept.is_finite() || params.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InferenceError::ModelLoadError(
                "linear model parameters must be finite".to_string(),
            ));
        }

        Ok(Self {
            coefficients: Array1::from(params.coefficients),
            intercept: params.intercept,
        })
    }
}

impl Regressor for LinearRegressor {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        check_width(self.n_features(), &rows)?;
        Ok(rows.dot(&self.coefficients) + self.intercept)
    }
}

/// How per-tree outputs are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Gradient boosting
    #[default]
    Sum,
    /// Random forest
    Mean,
}

/// Tree node; a split sends `x[feature] <= threshold` to `left`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub nodes: Vec<TreeNode>,
}

/// Serialized tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleParams {
    pub n_features: usize,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    pub trees: Vec<TreeParams>,
}

/// Tree ensemble regressor (boosted or bagged)
#[derive(Debug, Clone)]
pub struct TreeEnsembleRegressor {
    n_features: usize,
    base_score: f64,
    aggregation: Aggregation,
    trees: Vec<Vec<TreeNode>>,
}

impl TreeEnsembleRegressor {
    /// Load an ensemble. Children must come after their parent, which
    /// guarantees every walk reaches a leaf.
    pub fn from_params(params: TreeEnsembleParams) -> Result<Self, InferenceError> {
        if params.n_features == 0 {
            return Err(InferenceError::ModelLoadError(
                "tree ensemble declares zero features".to_string(),
            ));
        }
        if params.trees.is_empty() {
            return Err(InferenceError::ModelLoadError(
                "tree ensemble has no trees".to_string(),
            ));
        }

        for (t, tree) in params.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(InferenceError::ModelLoadError(format!("tree {t} is empty")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                let valid = match *node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        feature < params.n_features
                            && !threshold.is_nan()
                            && left > i
                            && right > i
                            && left < tree.nodes.len()
                            && right < tree.nodes.len()
                    }
                    TreeNode::Leaf { leaf } => leaf.is_finite(),
                };
                if !valid {
                    return Err(InferenceError::ModelLoadError(format!(
                        "tree {t} node {i} is malformed"
                    )));
                }
            }
        }

        Ok(Self {
            n_features: params.n_features,
            base_score: params.base_score,
            aggregation: params.aggregation,
            trees: params.trees.into_iter().map(|t| t.nodes).collect(),
        })
    }

    fn walk(nodes: &[TreeNode], row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match nodes[idx] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Regressor for TreeEnsembleRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        check_width(self.n_features, &rows)?;

        let outputs = rows
            .rows()
            .into_iter()
            .map(|row| {
                let total: f64 = self.trees.iter().map(|t| Self::walk(t, row)).sum();
                let combined = match self.aggregation {
                    Aggregation::Sum => total,
                    Aggregation::Mean => total / self.trees.len() as f64,
                };
                self.base_score + combined
            })
            .collect();

        Ok(outputs)
    }
}
