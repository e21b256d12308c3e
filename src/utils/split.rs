//! Positional train/test splits.

use std::ops::Range;

/// Prefix/suffix split of `n` ordered rows.
///
/// The last `test` rows are held out and the last `accuracy` rows of those
/// form the accuracy window. Rows are never shuffled and the two splits never
/// share a row.
///
/// # Example
/// ```
/// use intentional_impute::utils::split::TrainTestSplit;
///
/// let split = TrainTestSplit::new(30, 6, 10);
/// assert_eq!(split.train(), 0..24);
/// assert_eq!(split.test(), 24..30);
/// assert_eq!(split.accuracy(), 24..30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainTestSplit {
    n: usize,
    test: usize,
    accuracy: usize,
}

impl TrainTestSplit {
    /// Create a split; `test` is clamped to `n` and `accuracy` to `test`.
    pub fn new(n: usize, test: usize, accuracy: usize) -> Self {
        let test = test.min(n);
        Self {
            n,
            test,
            accuracy: accuracy.min(test),
        }
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of training rows.
    pub fn train_len(&self) -> usize {
        self.n - self.test
    }

    /// Number of test rows.
    pub fn test_len(&self) -> usize {
        self.test
    }

    /// Number of accuracy rows.
    pub fn accuracy_len(&self) -> usize {
        self.accuracy
    }

    /// Training row range.
    pub fn train(&self) -> Range<usize> {
        0..self.train_len()
    }

    /// Test row range.
    pub fn test(&self) -> Range<usize> {
        self.train_len()..self.n
    }

    /// Accuracy row range, a suffix of the test range.
    pub fn accuracy(&self) -> Range<usize> {
        self.n - self.accuracy..self.n
    }
}
