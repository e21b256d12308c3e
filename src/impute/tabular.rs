//! Tree and forest trainers for tables without time structure.
//!
//! Categorical columns are one-hot encoded and datetime columns become epoch
//! seconds. Rows with a missing target are set aside for prediction, the rest
//! are split by position, and a random search picks the configuration with
//! the best cross-validated R² on the training split.

use crate::config::RunConfig;
use crate::core::Table;
use crate::error::{ImputeError, Result};
use crate::impute::{FilledCell, Imputation};
use crate::models::tree::{DecisionTree, ForestParams, RandomForest, TreeParams};
use crate::models::{BoxedRegressor, Regressor};
use crate::search::{HyperParams, ParamGrid, RandomSearch, Sampling};
use crate::utils::cross_validation::cross_validate;
use crate::utils::encoding::encode_features;
use crate::utils::metrics::{holdout_score, HoldoutScore};
use crate::utils::split::TrainTestSplit;

/// Tree-based model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    /// A single regression tree.
    DecisionTree,
    /// A bagged forest of regression trees.
    RandomForest,
}

impl TreeKind {
    /// Name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DecisionTree => "decisionTree",
            Self::RandomForest => "randomForest",
        }
    }

    /// Search grid of this family.
    pub fn grid(&self) -> ParamGrid {
        let grid = ParamGrid::new()
            .with("max_depth", vec![2, 3, 4, 5])
            .with("min_samples_split", vec![2, 5, 10])
            .with("min_samples_leaf", vec![1, 2, 4]);
        match self {
            Self::DecisionTree => grid,
            Self::RandomForest => grid.with("n_estimators", vec![2, 3, 4, 5]),
        }
    }

    /// Build an unfitted model for one configuration.
    pub fn build(&self, hp: &HyperParams, seed: u64) -> BoxedRegressor {
        let tree = TreeParams::new(
            hp.get("max_depth"),
            hp.get("min_samples_split"),
            hp.get("min_samples_leaf"),
        );
        match self {
            Self::DecisionTree => Box::new(DecisionTree::new(tree)),
            Self::RandomForest => Box::new(RandomForest::new(ForestParams::new(
                hp.get("n_estimators"),
                tree,
                seed,
            ))),
        }
    }
}

/// Fill the missing cells of `target` with a tree-based model.
///
/// # Arguments
/// * `table` - Input table; every other column is a feature
/// * `target` - Numeric column to fill
/// * `kind` - Model family
/// * `test_size` - Rows held out for scoring
/// * `accuracy_size` - Trailing test rows scored separately
/// * `config` - Seed, trial budget and fold count
pub fn train(
    table: &Table,
    target: &str,
    kind: TreeKind,
    test_size: usize,
    accuracy_size: usize,
    config: &RunConfig,
) -> Result<Imputation> {
    let y_all = table.numeric(target)?;
    let missing = table.missing_rows(target)?;
    if missing.is_empty() {
        log::debug!("{}: no missing values in {}", kind.name(), target);
        return Ok(Imputation::unchanged(table));
    }

    let features = encode_features(table, target, config.separator)?;
    let observed: Vec<usize> = (0..table.n_rows())
        .filter(|i| missing.binary_search(i).is_err())
        .collect();
    let x = features.take(&observed);
    let y: Vec<f64> = observed.iter().filter_map(|&i| y_all[i]).collect();

    let split = TrainTestSplit::new(y.len(), test_size, accuracy_size);
    let (x_train, y_train) = (&x[split.train()], &y[split.train()]);

    let search = RandomSearch::new(kind.name(), config.n_iter, config.seed)
        .with_sampling(Sampling::WithoutReplacement);
    let result = search.run(&kind.grid(), |hp| {
        cross_validate(x_train, y_train, config.cv_folds, || kind.build(hp, config.seed))
            .map(|cv| cv.mean_score)
    });

    let mut imputation = Imputation {
        split: Some(split),
        successes: result.successes(),
        success_millis: Some(result.success_millis()),
        ..Imputation::unchanged(table)
    };
    let best = match result.require_best(kind.name()) {
        Ok((best, _)) => best.clone(),
        Err(err) => {
            log::warn!("{}({}) - final fit: {}", kind.name(), target, err);
            imputation.failure = Some(err);
            return Ok(imputation);
        }
    };

    let mut model = kind.build(&best, config.seed);
    let x_missing = features.take(&missing);
    match fit_and_fill(table, target, &mut model, (&x, &y), &split, (&x_missing, &missing)) {
        Ok((filled_table, filled, score)) => {
            imputation.table = filled_table;
            imputation.filled = Some(filled);
            imputation.score = Some(score.r2);
            imputation.accuracy = Some(score.accuracy);
        }
        Err(err) => {
            log::warn!("{}({}) - final fit: {}", kind.name(), best, err);
            imputation.failure = Some(err);
        }
    }
    imputation.best = Some(best);
    Ok(imputation)
}

/// Fit on the training split, score the test split and predict the gaps.
fn fit_and_fill(
    table: &Table,
    target: &str,
    model: &mut BoxedRegressor,
    (x, y): (&[Vec<f64>], &[f64]),
    split: &TrainTestSplit,
    (x_missing, missing): (&[Vec<f64>], &[usize]),
) -> Result<(Table, Vec<FilledCell>, HoldoutScore)> {
    if split.train_len() == 0 {
        return Err(ImputeError::InsufficientData { needed: 1, got: 0 });
    }
    model.fit(&x[split.train()], &y[split.train()])?;

    let predicted_test = model.predict(&x[split.test()])?;
    let actual_test = [y[split.test()].to_vec()];
    let score = holdout_score(&actual_test, &[predicted_test], split.accuracy_len())?;

    let predicted = model.predict(x_missing)?;
    let mut filled_table = table.clone();
    let column = filled_table.numeric_mut(target)?;
    let filled = missing
        .iter()
        .zip(predicted)
        .map(|(&row, value)| {
            column[row] = Some(value);
            FilledCell {
                column: target.to_string(),
                row,
                value,
            }
        })
        .collect();
    Ok((filled_table, filled, score))
}
