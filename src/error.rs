//! Error types for the imputation engine.

use thiserror::Error;

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Errors that can occur while reshaping data, fitting models or imputing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImputeError {
    /// Input table has no rows.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A referenced column does not exist.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A column holds values of an unexpected type.
    #[error("column '{column}' is not {expected}")]
    ColumnType { column: String, expected: &'static str },

    /// A date value could not be parsed with the rule of its granularity.
    #[error("cannot parse '{value}' in column '{column}' as {granularity}")]
    DateParse {
        column: String,
        value: String,
        granularity: &'static str,
    },

    /// Normal equations could not be solved.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// Fitted model produced non-finite values.
    #[error("model did not converge: {0}")]
    NonConvergence(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// A run of missing rows could not be predicted after the final fit.
    #[error("gap at row {row} left missing: {reason}")]
    GapNotFilled { row: usize, reason: String },

    /// The hyperparameter search finished without a single successful trial.
    #[error("no successful trial for {model}")]
    NoSuccessfulTrial { model: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ImputeError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = ImputeError::InsufficientData { needed: 10, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10, got 5"
        );

        let err = ImputeError::DateParse {
            column: "week_in_year".to_string(),
            value: "2021-xx".to_string(),
            granularity: "week",
        };
        assert_eq!(
            err.to_string(),
            "cannot parse '2021-xx' in column 'week_in_year' as week"
        );

        let err = ImputeError::NoSuccessfulTrial {
            model: "univariateTS".to_string(),
        };
        assert_eq!(err.to_string(), "no successful trial for univariateTS");

        let err = ImputeError::GapNotFilled {
            row: 3,
            reason: "model must be fitted before prediction".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "gap at row 3 left missing: model must be fitted before prediction"
        );
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ImputeError::FitRequired;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
