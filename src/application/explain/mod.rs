//! Word-level explanations of a single estimate.

pub mod explainer;
pub mod perturbation;
pub mod surrogate;
pub mod tokenize;

pub use explainer::{BatchScorer, ExplainerConfig, FeatureSelection, explain};
pub use tokenize::IndexedText;
