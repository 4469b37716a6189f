//! Random Forest regression: train, evaluate, explain, persist.
//!
//! A CART regression forest with variance-reduction splits, parallel
//! training via rayon, out-of-bag evaluation, mean-decrease-in-impurity
//! importances, partial dependence curves and bincode model persistence.

mod config;
mod error;
mod forest;
mod importance;
mod node;
mod oob;
mod partial;
mod predict;
mod result;
mod serialize;
mod split;
mod tree;

pub use config::{MaxFeatures, OobMode, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Node, NodeIndex, Variance};
pub use oob::OobScore;
pub use partial::{PartialDependence, PartialDependenceConfig, linspace, quantile};
pub use result::{RandomForestResult, TrainingMetadata};
pub use tree::{DecisionTreeConfig, RegressionTree};
