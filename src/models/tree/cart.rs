//! CART regression tree with squared-error splits.

use crate::error::{ImputeError, Result};
use crate::models::Regressor;

/// Growth limits of a regression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until the other limits stop it.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node.
    pub min_samples_split: usize,
    /// Minimum samples required in each leaf.
    pub min_samples_leaf: usize,
}

impl TreeParams {
    /// Create tree parameters.
    pub fn new(max_depth: usize, min_samples_split: usize, min_samples_leaf: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            min_samples_split,
            min_samples_leaf,
        }
    }
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree.
///
/// Rows go left when `x[feature] <= threshold`; missing (NaN) features always
/// go right.
///
/// # Example
/// ```
/// use intentional_impute::models::tree::{DecisionTree, TreeParams};
/// use intentional_impute::models::Regressor;
///
/// let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
/// let y: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();
///
/// let mut tree = DecisionTree::new(TreeParams::new(1, 2, 1));
/// tree.fit(&x, &y).unwrap();
/// assert_eq!(tree.predict(&[vec![2.0], vec![7.0]]).unwrap(), vec![0.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct DecisionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Create an unfitted tree.
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            n_features: 0,
        }
    }

    /// Get the growth parameters.
    pub fn params(&self) -> TreeParams {
        self.params
    }

    /// Number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the fitted tree (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Fit on the rows listed in `sample` (repeats allowed).
    pub fn fit_sample(&mut self, x: &[Vec<f64>], y: &[f64], sample: &[usize]) -> Result<()> {
        if x.len() != y.len() {
            return Err(ImputeError::DimensionMismatch {
                expected: y.len(),
                got: x.len(),
            });
        }
        if sample.is_empty() {
            return Err(ImputeError::InsufficientData { needed: 1, got: 0 });
        }
        self.n_features = x[sample[0]].len();
        self.nodes.clear();
        self.grow(x, y, sample.to_vec(), 0);
        Ok(())
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[f64], idx: Vec<usize>, depth: usize) -> usize {
        let n = idx.len();
        let value = idx.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
        let at = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        let too_small = n < self.params.min_samples_split.max(2)
            || n < 2 * self.params.min_samples_leaf.max(1);
        let pure = idx.iter().all(|&i| y[i] == y[idx[0]]);
        if depth_reached || too_small || pure {
            return at;
        }

        let Some(best) = self.best_split(x, y, &idx) else {
            return at;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| x[i][best.feature] <= best.threshold);

        let left = self.grow(x, y, left_idx, depth + 1);
        let right = self.grow(x, y, right_idx, depth + 1);
        self.nodes[at] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        at
    }

    fn best_split(&self, x: &[Vec<f64>], y: &[f64], idx: &[usize]) -> Option<BestSplit> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = idx.len() as f64;
        let total: f64 = idx.iter().map(|&i| y[i]).sum();
        let parent = total * total / n;
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.n_features {
            let mut observed: Vec<(f64, f64)> = Vec::with_capacity(idx.len());
            let mut nan_count = 0usize;
            for &i in idx {
                let v = x[i][feature];
                if v.is_nan() {
                    nan_count += 1;
                } else {
                    observed.push((v, y[i]));
                }
            }
            observed.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for split in 1..observed.len() {
                left_sum += observed[split - 1].1;
                let (lo, hi) = (observed[split - 1].0, observed[split].0);
                if lo == hi {
                    continue;
                }
                let n_left = split;
                let n_right = observed.len() - split + nan_count;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                // SSE reduction, up to the constant sum of squares
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent;
                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    let mid = lo + (hi - lo) / 2.0;
                    let threshold = if mid < hi { mid } else { lo };
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let sample: Vec<usize> = (0..y.len()).collect();
        self.fit_sample(x, y, &sample)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if self.nodes.is_empty() {
            return Err(ImputeError::FitRequired);
        }
        x.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(ImputeError::DimensionMismatch {
                        expected: self.n_features,
                        got: row.len(),
                    });
                }
                Ok(self.predict_row(row))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "DecisionTree"
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }
}
