pub mod feature_registry;

pub use feature_registry::{NUM_FEAT_DIM, NUMERIC_FEATURE_NAMES, NumericContext};
