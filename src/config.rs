//! Run configuration threaded through every reshaping, training and
//! orchestration call.

use crate::core::DateGranularity;

/// Binds a substring of a grouping-key name to the parsing rule of its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateKeyword {
    /// Substring looked up in the grouping-key name.
    pub keyword: String,
    /// Parsing rule applied to the matching column.
    pub granularity: DateGranularity,
}

impl DateKeyword {
    /// Create a new keyword binding.
    pub fn new(keyword: impl Into<String>, granularity: DateGranularity) -> Self {
        Self {
            keyword: keyword.into(),
            granularity,
        }
    }
}

/// Default keyword priority: the first keyword matching any grouping key wins.
pub fn default_date_keywords() -> Vec<DateKeyword> {
    vec![
        DateKeyword::new("week", DateGranularity::Week),
        DateKeyword::new("month", DateGranularity::Month),
        DateKeyword::new("year", DateGranularity::Year),
        DateKeyword::new("hour", DateGranularity::Timestamp),
        DateKeyword::new("timestamp", DateGranularity::Timestamp),
        DateKeyword::new("date", DateGranularity::Day),
        DateKeyword::new("day", DateGranularity::Day),
    ]
}

/// Configuration for one imputation run.
///
/// # Example
///
/// ```
/// use intentional_impute::config::RunConfig;
///
/// let config = RunConfig::default().with_seed(7).with_n_iter(5);
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.n_iter, 5);
/// assert_eq!(config.separator, '!');
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Seed for every random draw (search sampling, bootstrap samples).
    pub seed: u64,
    /// Maximum number of hyperparameter trials per search.
    pub n_iter: usize,
    /// Number of cross-validation folds for the tree searches.
    pub cv_folds: usize,
    /// Separator joining a measure and a slice value in pivoted column names.
    pub separator: char,
    /// Ordered date keywords; earlier entries take priority.
    pub date_keywords: Vec<DateKeyword>,
    /// Held-out share of rows, in percent.
    pub test_size_pct: f64,
    /// Upper bound on the accuracy window, in rows.
    pub accuracy_size: usize,
    /// Forward/backward fill covariate columns after pivoting.
    pub impute_covariates: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_iter: 20,
            cv_folds: 5,
            separator: '!',
            date_keywords: default_date_keywords(),
            test_size_pct: 20.0,
            accuracy_size: 10,
            impute_covariates: true,
        }
    }
}

impl RunConfig {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the trial budget of every search.
    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    /// Set the number of cross-validation folds.
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Set the composite column-name separator.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Replace the date keyword priority list.
    pub fn with_date_keywords(mut self, keywords: Vec<DateKeyword>) -> Self {
        self.date_keywords = keywords;
        self
    }

    /// Set the held-out share of rows, in percent.
    pub fn with_test_size_pct(mut self, pct: f64) -> Self {
        self.test_size_pct = pct;
        self
    }

    /// Set the accuracy window bound.
    pub fn with_accuracy_size(mut self, accuracy_size: usize) -> Self {
        self.accuracy_size = accuracy_size;
        self
    }

    /// Enable or disable covariate filling after pivoting.
    pub fn with_impute_covariates(mut self, impute: bool) -> Self {
        self.impute_covariates = impute;
        self
    }

    /// Test window size for a table of `rows` rows.
    pub fn test_rows(&self, rows: usize) -> usize {
        (rows as f64 * self.test_size_pct / 100.0).round().max(0.0) as usize
    }

    /// Accuracy window size given a test window size.
    pub fn accuracy_rows(&self, test_rows: usize) -> usize {
        test_rows.min(self.accuracy_size)
    }
}
