//! Gradient-boosted model evaluation
//!
//! Loads XGBoost JSON models and scores single feature rows:
//! - gbtree and dart tree ensembles (numeric and categorical splits)
//! - gblinear models
//! - softmax / logistic / hinge / raw output transforms

mod json;
mod objective;
mod tree;

pub use json::XgbModel;
pub use objective::{argmax, Objective};
pub use tree::Tree;

use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

use json::GradientBooster;

/// Errors raised while loading or evaluating a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported objective: {0}")]
    UnsupportedObjective(String),

    #[error("tree {0} has no nodes")]
    EmptyTree(usize),

    #[error("tree {tree}: {array} has {len} entries but the tree has {num_nodes} nodes")]
    TruncatedTree {
        tree: usize,
        array: &'static str,
        len: usize,
        num_nodes: usize,
    },

    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },

    #[error("tree {0} is not a tree (a node is reachable twice)")]
    MalformedTree(usize),

    #[error("tree {tree} node {node} splits on feature {feature} but the model has {n_features} features")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: i64,
        n_features: usize,
    },

    #[error("tree {tree} belongs to output group {group} but the model has {n_groups} groups")]
    GroupOutOfRange { tree: usize, group: i32, n_groups: usize },

    #[error("model has {trees} trees but {weights} dart weights")]
    DartWeights { trees: usize, weights: usize },

    #[error("gblinear weights length {actual} doesn't match (num_features + 1) * num_groups = {expected}")]
    InvalidLinearWeights { actual: usize, expected: usize },

    #[error("base_score has {actual} values but the model has {n_groups} groups")]
    BaseScore { actual: usize, n_groups: usize },

    #[error("objective {objective} cannot produce {n_groups} output groups")]
    GroupMismatch { objective: String, n_groups: usize },

    #[error("input row has {actual} features, model expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// Raw model output for one row.
///
/// Multi-class probability objectives produce one score per class; every
/// other objective produces a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Scores(Array1<f32>),
    Scalar(f32),
}

#[derive(Debug, Clone)]
enum Ensemble {
    Trees {
        trees: Vec<Tree>,
        groups: Vec<usize>,
        /// Per-tree scaling for dart models.
        weights: Option<Vec<f32>>,
    },
    /// Shape `[n_features + 1, n_groups]`; the last row holds the biases.
    Linear(Array2<f32>),
}

/// A validated, immutable gradient-boosted model.
#[derive(Debug, Clone)]
pub struct Booster {
    ensemble: Ensemble,
    objective: Objective,
    base_margin: Array1<f32>,
    n_features: usize,
}

impl Booster {
    /// Parse and validate an XGBoost JSON model.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let model = XgbModel::from_slice(bytes)?;
        Self::from_model(&model)
    }

    /// Validate a parsed model and convert it into evaluation form.
    pub fn from_model(model: &XgbModel) -> Result<Self, ModelError> {
        let learner = &model.learner;
        let params = &learner.learner_model_param;
        let objective = Objective::from_name(&learner.objective.name)?;

        let n_features = usize::try_from(params.num_feature).unwrap_or(0);
        let n_groups = if params.num_class <= 1 { 1 } else { params.num_class as usize };
        if objective.is_multiclass() != (n_groups > 1) {
            return Err(ModelError::GroupMismatch {
                objective: learner.objective.name.clone(),
                n_groups,
            });
        }

        let base_margin = match params.base_score.as_slice() {
            [single] => Array1::from_elem(n_groups, objective.base_margin(*single)),
            many if many.len() == n_groups => many.iter().map(|&b| objective.base_margin(b)).collect(),
            many => {
                return Err(ModelError::BaseScore {
                    actual: many.len(),
                    n_groups,
                })
            }
        };

        let ensemble = match &learner.gradient_booster {
            GradientBooster::Gbtree { model } => {
                let (trees, groups) = convert_trees(&model.trees, &model.tree_info, n_features, n_groups)?;
                Ensemble::Trees {
                    trees,
                    groups,
                    weights: None,
                }
            }
            GradientBooster::Dart { gbtree, weight_drop } => {
                let (trees, groups) =
                    convert_trees(&gbtree.model.trees, &gbtree.model.tree_info, n_features, n_groups)?;
                if weight_drop.len() != trees.len() {
                    return Err(ModelError::DartWeights {
                        trees: trees.len(),
                        weights: weight_drop.len(),
                    });
                }
                Ensemble::Trees {
                    trees,
                    groups,
                    weights: Some(weight_drop.clone()),
                }
            }
            GradientBooster::Gblinear { model } => {
                let expected = (n_features + 1) * n_groups;
                let weights = Array2::from_shape_vec((n_features + 1, n_groups), model.weights.clone())
                    .map_err(|_| ModelError::InvalidLinearWeights {
                        actual: model.weights.len(),
                        expected,
                    })?;
                Ensemble::Linear(weights)
            }
        };

        Ok(Self {
            ensemble,
            objective,
            base_margin,
            n_features,
        })
    }

    /// Number of input features the model was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of output groups (classes for multi-class models, otherwise 1).
    pub fn n_groups(&self) -> usize {
        self.base_margin.len()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Score a single row.
    pub fn predict_row(&self, row: ArrayView1<'_, f32>) -> Result<ModelOutput, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let row = row.to_vec();
        Ok(self.objective.transform(self.margins(&row)))
    }

    fn margins(&self, row: &[f32]) -> Array1<f32> {
        let mut margins = self.base_margin.clone();
        match &self.ensemble {
            Ensemble::Trees { trees, groups, weights } => {
                for (i, (tree, &group)) in trees.iter().zip(groups).enumerate() {
                    let scale = weights.as_ref().map_or(1.0, |w| w[i]);
                    margins[group] += tree.predict(row) * scale;
                }
            }
            Ensemble::Linear(weights) => {
                let n = self.n_features;
                for group in 0..margins.len() {
                    let mut sum = weights[[n, group]];
                    for (j, &x) in row.iter().enumerate() {
                        // gblinear treats missing values as zero contribution
                        if !x.is_nan() {
                            sum += weights[[j, group]] * x;
                        }
                    }
                    margins[group] += sum;
                }
            }
        }
        margins
    }
}

fn convert_trees(
    raw: &[json::Tree],
    tree_info: &[i32],
    n_features: usize,
    n_groups: usize,
) -> Result<(Vec<Tree>, Vec<usize>), ModelError> {
    let mut trees = Vec::with_capacity(raw.len());
    let mut groups = Vec::with_capacity(raw.len());
    for (idx, xgb_tree) in raw.iter().enumerate() {
        let group = tree_info.get(idx).copied().unwrap_or(0);
        let group_idx = usize::try_from(group)
            .ok()
            .filter(|g| *g < n_groups)
            .ok_or(ModelError::GroupOutOfRange {
                tree: idx,
                group,
                n_groups,
            })?;
        trees.push(Tree::from_xgb(xgb_tree, idx, n_features)?);
        groups.push(group_idx);
    }
    Ok((trees, groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::{json, Value};

    fn stump(feature: i32, threshold: f32, left: f32, right: f32) -> Value {
        json!({
            "tree_param": {"num_nodes": "3", "size_leaf_vector": "1", "num_feature": "2", "num_deleted": "0"},
            "id": 0,
            "base_weights": [0.0, left, right],
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "parents": [2147483647, 0, 0],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, left, right],
            "split_type": [0, 0, 0],
            "default_left": [0, 0, 0],
            "categories": [],
            "categories_nodes": [],
            "categories_segments": [],
            "categories_sizes": []
        })
    }

    fn model(objective: &str, num_class: &str, booster: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "version": [2, 0, 3],
            "learner": {
                "feature_names": [],
                "feature_types": [],
                "gradient_booster": booster,
                "objective": {"name": objective},
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": num_class,
                    "num_feature": "2",
                    "num_target": "1",
                    "boost_from_average": "1"
                }
            }
        }))
        .unwrap()
    }

    fn multiclass() -> Booster {
        let booster = json!({
            "name": "gbtree",
            "model": {
                "gbtree_model_param": {"num_trees": "3", "num_parallel_tree": "1"},
                "trees": [
                    stump(0, 1.0, 1.0, -1.0),
                    stump(0, 1.0, -1.0, 1.0),
                    stump(1, 5.0, -1.0, 2.0)
                ],
                "tree_info": [0, 1, 2]
            }
        });
        Booster::from_slice(&model("multi:softprob", "3", booster)).unwrap()
    }

    #[test]
    fn test_multiclass_scores_per_class() {
        let booster = multiclass();
        assert_eq!(booster.n_groups(), 3);
        assert_eq!(booster.n_features(), 2);

        let out = booster.predict_row(array![0.5, 0.0].view()).unwrap();
        match out {
            ModelOutput::Scores(scores) => {
                assert_eq!(scores.len(), 3);
                assert_eq!(argmax(scores.as_slice().unwrap()), 0);
            }
            other => panic!("expected scores, got {:?}", other),
        }

        let out = booster.predict_row(array![0.5, 9.0].view()).unwrap();
        let ModelOutput::Scores(scores) = out else { panic!("expected scores") };
        assert_eq!(argmax(scores.as_slice().unwrap()), 2);
    }

    #[test]
    fn test_row_width_must_match() {
        let err = multiclass().predict_row(array![1.0].view()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_binary_logistic_scalar() {
        let booster = json!({
            "name": "gbtree",
            "model": {"trees": [stump(0, 1.0, -3.0, 3.0)], "tree_info": [0]}
        });
        let booster = Booster::from_slice(&model("binary:logistic", "0", booster)).unwrap();
        let ModelOutput::Scalar(low) = booster.predict_row(array![0.0, 0.0].view()).unwrap() else {
            panic!("expected scalar")
        };
        let ModelOutput::Scalar(high) = booster.predict_row(array![2.0, 0.0].view()).unwrap() else {
            panic!("expected scalar")
        };
        assert!(low < 0.1);
        assert!(high > 0.9);
    }

    #[test]
    fn test_dart_weights_scale_trees() {
        let booster = json!({
            "name": "dart",
            "gbtree": {"name": "gbtree", "model": {
                "trees": [stump(0, 1.0, 2.0, 2.0), stump(0, 1.0, 4.0, 4.0)],
                "tree_info": [0, 0]
            }},
            "weight_drop": [0.5, 0.25]
        });
        let booster = Booster::from_slice(&model("reg:squarederror", "0", booster)).unwrap();
        let out = booster.predict_row(array![0.0, 0.0].view()).unwrap();
        assert_eq!(out, ModelOutput::Scalar(0.5 + 1.0 + 1.0));
    }

    #[test]
    fn test_logitraw_base_score_is_logit() {
        let booster = json!({
            "name": "gbtree",
            "model": {"trees": [stump(0, 1.0, 0.0, 0.0)], "tree_info": [0]}
        });
        let booster = Booster::from_slice(&model("binary:logitraw", "0", booster)).unwrap();
        let out = booster.predict_row(array![0.0, 0.0].view()).unwrap();
        assert_eq!(out, ModelOutput::Scalar(0.0));
    }

    #[test]
    fn test_gblinear_uses_bias_row() {
        let booster = json!({"name": "gblinear", "model": {"weights": [2.0, -1.0, 0.25]}});
        let booster = Booster::from_slice(&model("reg:squarederror", "0", booster)).unwrap();
        let out = booster.predict_row(array![1.0, 3.0].view()).unwrap();
        assert_eq!(out, ModelOutput::Scalar(0.5 + 2.0 - 3.0 + 0.25));

        let bad = json!({"name": "gblinear", "model": {"weights": [2.0]}});
        assert!(matches!(
            Booster::from_slice(&model("reg:squarederror", "0", bad)),
            Err(ModelError::InvalidLinearWeights { actual: 1, expected: 3 })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_models() {
        let bad_group = json!({"name": "gbtree", "model": {"trees": [stump(0, 1.0, 1.0, 1.0)], "tree_info": [4]}});
        assert!(matches!(
            Booster::from_slice(&model("multi:softprob", "3", bad_group)),
            Err(ModelError::GroupOutOfRange { group: 4, .. })
        ));

        let single = json!({"name": "gbtree", "model": {"trees": [], "tree_info": []}});
        assert!(matches!(
            Booster::from_slice(&model("multi:softprob", "0", single)),
            Err(ModelError::GroupMismatch { .. })
        ));

        assert!(matches!(Booster::from_slice(b"{\"learner\": 1}"), Err(ModelError::Parse(_))));
    }
}
