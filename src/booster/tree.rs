//! Validated decision trees in XGBoost's parallel-array layout.

use std::collections::HashMap;

use super::json::Tree as XgbTree;
use super::ModelError;

#[derive(Debug, Clone, PartialEq)]
enum Split {
    /// `x < threshold` goes left.
    Numeric { threshold: f32 },
    /// Listed categories go right.
    Categorical { categories: Vec<i32> },
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f32),
    Branch {
        feature: usize,
        split: Split,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

/// A single regression tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Convert and validate a parsed XGBoost tree.
    ///
    /// Every split must reference a feature below `n_features` and children
    /// inside the node array, so traversal never indexes out of bounds.
    pub fn from_xgb(tree: &XgbTree, tree_idx: usize, n_features: usize) -> Result<Self, ModelError> {
        let num_nodes = usize::try_from(tree.tree_param.num_nodes).unwrap_or(0);
        if num_nodes == 0 {
            return Err(ModelError::EmptyTree(tree_idx));
        }

        let arrays = [
            ("base_weights", tree.base_weights.len()),
            ("left_children", tree.left_children.len()),
            ("right_children", tree.right_children.len()),
            ("split_indices", tree.split_indices.len()),
            ("split_conditions", tree.split_conditions.len()),
            ("default_left", tree.default_left.len()),
        ];
        for (name, len) in arrays {
            if len < num_nodes {
                return Err(ModelError::TruncatedTree {
                    tree: tree_idx,
                    array: name,
                    len,
                    num_nodes,
                });
            }
        }

        let categories = categorical_splits(tree);
        let mut nodes = Vec::with_capacity(num_nodes);

        for node_idx in 0..num_nodes {
            let left = tree.left_children[node_idx];
            if left == -1 {
                nodes.push(Node::Leaf(tree.base_weights[node_idx]));
                continue;
            }

            let right = tree.right_children[node_idx];
            let left = child_index(left, tree_idx, node_idx, num_nodes)?;
            let right = child_index(right, tree_idx, node_idx, num_nodes)?;

            let feature = usize::try_from(tree.split_indices[node_idx])
                .ok()
                .filter(|f| *f < n_features)
                .ok_or(ModelError::FeatureOutOfRange {
                    tree: tree_idx,
                    node: node_idx,
                    feature: tree.split_indices[node_idx] as i64,
                    n_features,
                })?;

            let is_categorical = tree.split_type.get(node_idx).copied().unwrap_or(0) == 1;
            let split = if is_categorical {
                Split::Categorical {
                    categories: categories.get(&node_idx).cloned().unwrap_or_default(),
                }
            } else {
                Split::Numeric {
                    threshold: tree.split_conditions[node_idx],
                }
            };

            nodes.push(Node::Branch {
                feature,
                split,
                default_left: tree.default_left[node_idx],
                left,
                right,
            });
        }

        let tree = Self { nodes };
        tree.check_acyclic(tree_idx)?;
        Ok(tree)
    }

    /// Leaf value reached by `row`.
    pub fn predict(&self, row: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Branch {
                    feature,
                    split,
                    default_left,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(f32::NAN);
                    let go_left = if x.is_nan() {
                        *default_left
                    } else {
                        match split {
                            Split::Numeric { threshold } => x < *threshold,
                            Split::Categorical { categories } => !categories.contains(&(x as i32)),
                        }
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Children must be strictly deeper than their parent; a cycle would make
    /// `predict` spin forever.
    fn check_acyclic(&self, tree_idx: usize) -> Result<(), ModelError> {
        let mut depth = vec![None; self.nodes.len()];
        depth[0] = Some(0usize);
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if let Node::Branch { left, right, .. } = &self.nodes[idx] {
                for child in [*left, *right] {
                    if depth[child].is_some() {
                        return Err(ModelError::MalformedTree(tree_idx));
                    }
                    depth[child] = depth[idx].map(|d| d + 1);
                    stack.push(child);
                }
            }
        }
        Ok(())
    }
}

fn child_index(child: i32, tree: usize, node: usize, num_nodes: usize) -> Result<usize, ModelError> {
    usize::try_from(child)
        .ok()
        .filter(|c| *c < num_nodes && *c != 0)
        .ok_or(ModelError::InvalidNodeIndex {
            tree,
            node,
            child,
            num_nodes,
        })
}

/// Node index -> category values sent right, from the flat segment arrays.
fn categorical_splits(tree: &XgbTree) -> HashMap<usize, Vec<i32>> {
    let mut map = HashMap::new();
    for (i, node) in tree.categories_nodes.iter().enumerate() {
        let (Some(&start), Some(&size)) = (tree.categories_segments.get(i), tree.categories_sizes.get(i)) else {
            continue;
        };
        let start = start.max(0) as usize;
        let end = (start + size.max(0) as usize).min(tree.categories.len());
        if start <= end {
            map.insert(*node as usize, tree.categories[start..end].to_vec());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump(feature: i32, threshold: f32) -> XgbTree {
        serde_json::from_value(json!({
            "tree_param": {"num_nodes": "3", "num_feature": "2"},
            "base_weights": [0.0, 1.0, -1.0],
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, 1.0, -1.0],
            "default_left": [0, 0, 0]
        }))
        .unwrap()
    }

    #[test]
    fn test_numeric_split_goes_left_below_threshold() {
        let tree = Tree::from_xgb(&stump(1, 2.5), 0, 2).unwrap();
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.predict(&[0.0, 2.0]), 1.0);
        assert_eq!(tree.predict(&[0.0, 2.5]), -1.0);
        assert_eq!(tree.predict(&[0.0, 10.0]), -1.0);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let mut raw = stump(0, 1.0);
        raw.default_left = vec![true, false, false];
        let tree = Tree::from_xgb(&raw, 0, 2).unwrap();
        assert_eq!(tree.predict(&[f32::NAN, 0.0]), 1.0);
    }

    #[test]
    fn test_categorical_split_sends_listed_categories_right() {
        let mut raw = stump(0, 0.0);
        raw.split_type = vec![1, 0, 0];
        raw.categories = vec![2, 4];
        raw.categories_nodes = vec![0];
        raw.categories_segments = vec![0];
        raw.categories_sizes = vec![2];
        let tree = Tree::from_xgb(&raw, 0, 2).unwrap();
        assert_eq!(tree.predict(&[4.0, 0.0]), -1.0);
        assert_eq!(tree.predict(&[3.0, 0.0]), 1.0);
    }

    #[test]
    fn test_rejects_feature_outside_schema() {
        let err = Tree::from_xgb(&stump(5, 1.0), 3, 2).unwrap_err();
        assert!(matches!(err, ModelError::FeatureOutOfRange { tree: 3, feature: 5, .. }));
    }

    #[test]
    fn test_rejects_bad_child_and_cycles() {
        let mut raw = stump(0, 1.0);
        raw.right_children = vec![7, -1, -1];
        assert!(matches!(
            Tree::from_xgb(&raw, 0, 2).unwrap_err(),
            ModelError::InvalidNodeIndex { child: 7, .. }
        ));

        let mut shared = stump(0, 1.0);
        shared.right_children = vec![1, -1, -1];
        assert!(matches!(
            Tree::from_xgb(&shared, 0, 2).unwrap_err(),
            ModelError::MalformedTree(0)
        ));
    }

    #[test]
    fn test_rejects_empty_and_truncated_trees() {
        let mut empty = stump(0, 1.0);
        empty.tree_param.num_nodes = 0;
        assert!(matches!(Tree::from_xgb(&empty, 1, 2).unwrap_err(), ModelError::EmptyTree(1)));

        let mut short = stump(0, 1.0);
        short.base_weights.truncate(2);
        assert!(matches!(
            Tree::from_xgb(&short, 0, 2).unwrap_err(),
            ModelError::TruncatedTree { array: "base_weights", .. }
        ));
    }
}
