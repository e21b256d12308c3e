//! Bagged ensemble of regression trees.

use crate::error::{ImputeError, Result};
use crate::models::tree::{DecisionTree, TreeParams};
use crate::models::Regressor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random forest configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Growth limits shared by every tree.
    pub tree: TreeParams,
    /// Seed of the bootstrap sampler.
    pub seed: u64,
}

impl ForestParams {
    /// Create forest parameters.
    pub fn new(n_estimators: usize, tree: TreeParams, seed: u64) -> Self {
        Self {
            n_estimators,
            tree,
            seed,
        }
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::new(100, TreeParams::default(), 0)
    }
}

/// Random forest regressor: each tree sees a bootstrap sample of the rows and
/// predictions are averaged.
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Create an unfitted forest.
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
        }
    }

    /// Get the forest parameters.
    pub fn params(&self) -> ForestParams {
        self.params
    }

    /// Fitted trees.
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if self.params.n_estimators == 0 {
            return Err(ImputeError::InvalidParameter(
                "n_estimators must be positive".into(),
            ));
        }
        let n = y.len();
        if n == 0 {
            return Err(ImputeError::InsufficientData { needed: 1, got: 0 });
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = DecisionTree::new(self.params.tree);
                tree.fit_sample(x, y, &sample).map(|_| tree)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(ImputeError::FitRequired);
        }
        let mut sums = vec![0.0; x.len()];
        for tree in &self.trees {
            for (s, p) in sums.iter_mut().zip(tree.predict(x)?) {
                *s += p;
            }
        }
        let k = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / k).collect())
    }

    fn name(&self) -> &str {
        "RandomForest"
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
