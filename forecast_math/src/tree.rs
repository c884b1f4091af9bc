//! Greedy least-squares regression trees
//!
//! Trees grow leaf-wise: the leaf whose best split reduces squared error the
//! most is split next, until `max_leaves` is reached or no leaf can split.
//! They are stored as flat arrays of internal nodes. A child reference
//! `>= 0` points at another internal node, a negative reference `-(k + 1)`
//! points at leaf `k`. A tree without splits holds a single leaf.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth of any leaf (root is depth 0)
    pub max_depth: usize,
    /// Maximum number of leaves
    pub max_leaves: usize,
    /// Minimum number of samples on each side of a split
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_leaves: 31,
            min_samples_leaf: 20,
        }
    }
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    split_features: Vec<usize>,
    thresholds: Vec<f64>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_values: Vec<f64>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A leaf still open for splitting
struct Frontier {
    indices: Vec<usize>,
    depth: usize,
    /// Internal node and side (`true` = left) pointing at this leaf
    parent: Option<(usize, bool)>,
    split: Option<Split>,
}

impl RegressionTree {
    /// Fit a tree to `target` over the rows named by `indices`.
    ///
    /// `features` restricts which columns may be split on.
    pub fn fit(
        rows: &[Vec<f64>],
        target: &[f64],
        indices: &[usize],
        features: &[usize],
        params: TreeParams,
    ) -> Result<Self> {
        if indices.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot grow a tree on zero samples".to_string(),
            ));
        }
        if rows.len() != target.len() {
            return Err(MathError::InvalidInput(format!(
                "Matrix has {} rows but target has {} values",
                rows.len(),
                target.len()
            )));
        }
        if params.min_samples_leaf == 0 {
            return Err(MathError::InvalidInput(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if params.max_leaves == 0 {
            return Err(MathError::InvalidInput(
                "max_leaves must be at least 1".to_string(),
            ));
        }

        let mut tree = Self {
            split_features: Vec::new(),
            thresholds: Vec::new(),
            left_child: Vec::new(),
            right_child: Vec::new(),
            leaf_values: Vec::new(),
        };
        tree.grow(rows, target, indices.to_vec(), features, params);
        Ok(tree)
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        target: &[f64],
        indices: Vec<usize>,
        features: &[usize],
        params: TreeParams,
    ) {
        let open = |indices: Vec<usize>, depth: usize, parent: Option<(usize, bool)>| {
            let split = if depth < params.max_depth {
                best_split(rows, target, &indices, features, params.min_samples_leaf)
            } else {
                None
            };
            Frontier {
                indices,
                depth,
                parent,
                split,
            }
        };

        let mut leaves = vec![open(indices, 0, None)];
        while leaves.len() < params.max_leaves {
            let mut chosen: Option<usize> = None;
            for (i, leaf) in leaves.iter().enumerate() {
                let Some(split) = &leaf.split else { continue };
                let better = chosen
                    .and_then(|c| leaves[c].split.as_ref())
                    .map_or(true, |best| split.gain > best.gain);
                if better {
                    chosen = Some(i);
                }
            }
            let Some(chosen) = chosen else { break };

            let leaf = leaves.remove(chosen);
            let Some(split) = leaf.split else { break };

            let node = self.split_features.len();
            self.split_features.push(split.feature);
            self.thresholds.push(split.threshold);
            self.left_child.push(0);
            self.right_child.push(0);
            self.link(leaf.parent, node as i32);

            let (left, right): (Vec<usize>, Vec<usize>) = leaf
                .indices
                .into_iter()
                .partition(|&i| rows[i][split.feature] <= split.threshold);
            leaves.push(open(left, leaf.depth + 1, Some((node, true))));
            leaves.push(open(right, leaf.depth + 1, Some((node, false))));
        }

        for leaf in leaves {
            let mean = leaf.indices.iter().map(|&i| target[i]).sum::<f64>()
                / leaf.indices.len() as f64;
            self.leaf_values.push(mean);
            self.link(leaf.parent, -(self.leaf_values.len() as i32));
        }
    }

    fn link(&mut self, parent: Option<(usize, bool)>, child: i32) {
        match parent {
            Some((node, true)) => self.left_child[node] = child,
            Some((node, false)) => self.right_child[node] = child,
            None => {}
        }
    }

    /// Predict a single row
    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.split_features.is_empty() {
            return self.leaf_values.first().copied().unwrap_or_default();
        }

        let mut node_idx = 0usize;
        loop {
            let feature_idx = self.split_features[node_idx];
            let feature_value = features.get(feature_idx).copied().unwrap_or(0.0);
            let child = if feature_value <= self.thresholds[node_idx] {
                self.left_child[node_idx]
            } else {
                self.right_child[node_idx]
            };

            if child < 0 {
                let leaf_idx = (-child - 1) as usize;
                return self.leaf_values[leaf_idx];
            }

            node_idx = child as usize;
        }
    }

    /// Number of leaves
    pub fn num_leaves(&self) -> usize {
        self.leaf_values.len()
    }

    /// Number of internal split nodes
    pub fn num_splits(&self) -> usize {
        self.split_features.len()
    }
}

/// Find the split with the largest reduction in squared error
fn best_split(
    rows: &[Vec<f64>],
    target: &[f64],
    indices: &[usize],
    features: &[usize],
    min_samples_leaf: usize,
) -> Option<Split> {
    let n = indices.len();
    if n < 2 * min_samples_leaf {
        return None;
    }

    let total: f64 = indices.iter().map(|&i| target[i]).sum();
    let parent_score = total * total / n as f64;
    let mut best: Option<Split> = None;

    let mut order = indices.to_vec();
    for &feature in features {
        order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += target[order[k]];
            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < min_samples_leaf || right_n < min_samples_leaf {
                continue;
            }

            let here = rows[order[k]][feature];
            let next = rows[order[k + 1]][feature];
            if here == next {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
            let gain = score - parent_score;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
