//! Random hyperparameter search over small discrete grids.
//!
//! Every trial is recorded as a [`TrialOutcome`]; failures are logged and
//! kept in the outcome list, and only successful trials compete for best.
//!
//! # Example
//!
//! ```
//! use intentional_impute::search::{ParamGrid, RandomSearch, Sampling};
//!
//! let grid = ParamGrid::new().with("p", vec![0, 1, 2]).with("q", vec![0, 1]);
//! let search = RandomSearch::new("demo", 4, 42).with_sampling(Sampling::WithoutReplacement);
//! let result = search.run(&grid, |hp| Ok(-((hp.get("p") + hp.get("q")) as f64)));
//!
//! assert_eq!(result.trials().len(), 4);
//! assert_eq!(result.successes(), 4);
//! assert!(result.best().is_some());
//! ```

use crate::error::{ImputeError, Result};
use crate::utils::metrics::{improves, HoldoutScore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::time::{Duration, Instant};

/// One drawn hyperparameter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HyperParams(Vec<(&'static str, usize)>);

impl HyperParams {
    /// Value of a named hyperparameter; absent names read as 0.
    pub fn get(&self, name: &str) -> usize {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0, |(_, v)| *v)
    }

    /// Name/value pairs in grid order.
    pub fn pairs(&self) -> &[(&'static str, usize)] {
        &self.0
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(n, v)| format!("{n}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Discrete hyperparameter grid.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    dims: Vec<(&'static str, Vec<usize>)>,
}

impl ParamGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dimension.
    pub fn with(mut self, name: &'static str, values: Vec<usize>) -> Self {
        self.dims.push((name, values));
        self
    }

    /// Size of the Cartesian product.
    pub fn size(&self) -> usize {
        self.dims.iter().map(|(_, v)| v.len()).product()
    }

    /// Every configuration, first dimension slowest.
    pub fn all(&self) -> Vec<HyperParams> {
        let mut combos: Vec<Vec<(&'static str, usize)>> = vec![Vec::new()];
        for (name, values) in &self.dims {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    values.iter().map(move |&v| {
                        let mut c = prefix.clone();
                        c.push((*name, v));
                        c
                    })
                })
                .collect();
        }
        combos.into_iter().map(HyperParams).collect()
    }

    /// Draw one value per dimension independently.
    pub fn draw(&self, rng: &mut StdRng) -> Option<HyperParams> {
        self.dims
            .iter()
            .map(|(name, values)| values.choose(rng).map(|&v| (*name, v)))
            .collect::<Option<Vec<_>>>()
            .map(HyperParams)
    }
}

/// How configurations are drawn from the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Independent draws; the same configuration may be tried twice.
    WithReplacement,
    /// Distinct configurations from a shuffled grid.
    WithoutReplacement,
}

/// Score-bearing result of a successful trial.
pub trait Scored {
    /// Score to maximise.
    fn score(&self) -> f64;
}

impl Scored for f64 {
    fn score(&self) -> f64 {
        *self
    }
}

impl Scored for HoldoutScore {
    fn score(&self) -> f64 {
        self.r2
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone)]
pub struct TrialOutcome<T> {
    /// Configuration tried.
    pub params: HyperParams,
    /// Fit result, or the error that discarded the trial.
    pub result: Result<T>,
    /// Wall-clock time of the trial.
    pub elapsed: Duration,
}

/// All trials of a search and the index of the best one.
#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    trials: Vec<TrialOutcome<T>>,
    best: Option<usize>,
}

impl<T: Scored> SearchResult<T> {
    /// Select the best successful trial: maximum score, first seen wins ties.
    pub fn from_trials(trials: Vec<TrialOutcome<T>>) -> Self {
        let mut best: Option<usize> = None;
        for (i, trial) in trials.iter().enumerate() {
            let Ok(value) = &trial.result else { continue };
            let incumbent = best.and_then(|b| trials[b].result.as_ref().ok().map(Scored::score));
            if improves(value.score(), incumbent) {
                best = Some(i);
            }
        }
        Self { trials, best }
    }

    /// Every trial in draw order.
    pub fn trials(&self) -> &[TrialOutcome<T>] {
        &self.trials
    }

    /// Best configuration and its result.
    pub fn best(&self) -> Option<(&HyperParams, &T)> {
        let trial = &self.trials[self.best?];
        trial.result.as_ref().ok().map(|r| (&trial.params, r))
    }

    /// Best configuration and its result, or the failure of the whole search.
    pub fn require_best(&self, model: &str) -> Result<(&HyperParams, &T)> {
        self.best().ok_or_else(|| ImputeError::NoSuccessfulTrial {
            model: model.to_string(),
        })
    }

    /// Number of successful trials.
    pub fn successes(&self) -> usize {
        self.trials.iter().filter(|t| t.result.is_ok()).count()
    }

    /// Total wall-clock time of the successful trials, in milliseconds.
    pub fn success_millis(&self) -> u128 {
        self.trials
            .iter()
            .filter(|t| t.result.is_ok())
            .map(|t| t.elapsed.as_millis())
            .sum()
    }
}

/// Random search driver.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    name: String,
    n_iter: usize,
    seed: u64,
    sampling: Sampling,
}

impl RandomSearch {
    /// Create a search named `name` (used in log lines) with a trial budget.
    pub fn new(name: &str, n_iter: usize, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            n_iter,
            seed,
            sampling: Sampling::WithReplacement,
        }
    }

    /// Set the sampling mode.
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Configurations this search will try, in order.
    pub fn draws(&self, grid: &ParamGrid) -> Vec<HyperParams> {
        let budget = grid.size().min(self.n_iter);
        let mut rng = StdRng::seed_from_u64(self.seed);
        match self.sampling {
            Sampling::WithReplacement => (0..budget).filter_map(|_| grid.draw(&mut rng)).collect(),
            Sampling::WithoutReplacement => {
                let mut all = grid.all();
                all.shuffle(&mut rng);
                all.truncate(budget);
                all
            }
        }
    }

    /// Evaluate every drawn configuration and keep the best by score.
    pub fn run<T, F>(&self, grid: &ParamGrid, mut evaluate: F) -> SearchResult<T>
    where
        T: Scored,
        F: FnMut(&HyperParams) -> Result<T>,
    {
        let trials = self
            .draws(grid)
            .into_iter()
            .map(|params| {
                let start = Instant::now();
                let result = evaluate(&params);
                if let Err(err) = &result {
                    log::warn!("{}({}) - training: {}", self.name, params, err);
                }
                TrialOutcome {
                    params,
                    result,
                    elapsed: start.elapsed(),
                }
            })
            .collect();
        let result = SearchResult::from_trials(trials);
        log::debug!(
            "{}: {} of {} trials succeeded",
            self.name,
            result.successes(),
            result.trials().len()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_grid() -> ParamGrid {
        let orders = vec![0, 1, 2, 4, 8, 24];
        ParamGrid::new()
            .with("p", orders.clone())
            .with("d", orders.clone())
            .with("q", orders)
            .with("P", vec![0])
    }

    #[test]
    fn test_grid_enumeration() {
        let grid = ParamGrid::new().with("a", vec![1, 2]).with("b", vec![3, 4, 5]);
        assert_eq!(grid.size(), 6);
        let all = grid.all();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].pairs(), &[("a", 1), ("b", 3)]);
        assert_eq!(all[5].pairs(), &[("a", 2), ("b", 5)]);
        assert_eq!(all[0].to_string(), "{a=1, b=3}");
    }

    #[test]
    fn test_budget_is_capped_by_grid() {
        let grid = ParamGrid::new().with("a", vec![1, 2]);
        let search = RandomSearch::new("t", 20, 1);
        assert_eq!(search.draws(&grid).len(), 2);
        assert_eq!(RandomSearch::new("t", 20, 1).draws(&order_grid()).len(), 20);
    }

    #[test]
    fn test_draws_are_seeded() {
        let a = RandomSearch::new("t", 10, 42).draws(&order_grid());
        let b = RandomSearch::new("t", 10, 42).draws(&order_grid());
        assert_eq!(a, b);
        assert!(a.iter().all(|hp| hp.get("P") == 0));
    }

    #[test]
    fn test_without_replacement_is_distinct() {
        let grid = ParamGrid::new().with("a", vec![1, 2, 3]).with("b", vec![1, 2, 3]);
        let mut draws = RandomSearch::new("t", 9, 3)
            .with_sampling(Sampling::WithoutReplacement)
            .draws(&grid);
        draws.sort_by_key(|hp| (hp.get("a"), hp.get("b")));
        draws.dedup();
        assert_eq!(draws.len(), 9);
    }

    #[test]
    fn test_failures_are_skipped() {
        let grid = ParamGrid::new().with("a", vec![0, 1, 2, 3]);
        let search = RandomSearch::new("t", 4, 0).with_sampling(Sampling::WithoutReplacement);
        let result = search.run(&grid, |hp| {
            if hp.get("a") % 2 == 0 {
                Err(ImputeError::NonConvergence("even".into()))
            } else {
                Ok(hp.get("a") as f64)
            }
        });
        assert_eq!(result.successes(), 2);
        let (best, score) = result.best().unwrap();
        assert_eq!(best.get("a"), 3);
        assert_eq!(*score, 3.0);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let trials = vec![
            TrialOutcome {
                params: HyperParams(vec![("a", 1)]),
                result: Ok(0.5),
                elapsed: Duration::ZERO,
            },
            TrialOutcome {
                params: HyperParams(vec![("a", 2)]),
                result: Ok(0.5),
                elapsed: Duration::ZERO,
            },
        ];
        let result = SearchResult::from_trials(trials);
        assert_eq!(result.best().unwrap().0.get("a"), 1);
    }

    #[test]
    fn test_all_failures_report_no_successful_trial() {
        let grid = ParamGrid::new().with("a", vec![0, 1]);
        let result: SearchResult<f64> = RandomSearch::new("univariateTS", 5, 0)
            .run(&grid, |_| Err(ImputeError::SingularMatrix("x".into())));
        assert_eq!(result.successes(), 0);
        assert!(result.best().is_none());
        assert_eq!(
            result.require_best("univariateTS").unwrap_err(),
            ImputeError::NoSuccessfulTrial {
                model: "univariateTS".into()
            }
        );
    }
}
