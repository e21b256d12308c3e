//! Numeric utilities shared by the trainers.

pub mod cross_validation;
pub mod encoding;
pub mod metrics;
pub mod ols;
pub mod split;

pub use cross_validation::{cross_validate, kfold, CVResults};
pub use encoding::{encode_features, FeatureMatrix};
pub use metrics::{holdout_score, r2_score, r2_score_multi, HoldoutScore};
pub use ols::{ols_fit, ols_fit_multi, LinearFit};
pub use split::TrainTestSplit;
