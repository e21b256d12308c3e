//! Tree-based regressors used for time-agnostic imputation.

mod cart;
mod forest;

pub use cart::{DecisionTree, TreeParams};
pub use forest::{ForestParams, RandomForest};
