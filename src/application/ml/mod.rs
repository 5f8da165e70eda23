pub mod embedding;
pub mod feature_builder;
pub mod gradient_boosting;
pub mod onnx_predictor;
pub mod predictor;
pub mod registry;
pub mod scaler;

pub use embedding::{StaticEmbedder, TextEmbedder};
pub use feature_builder::{FeatureBuilder, FeatureVector};
pub use gradient_boosting::GradientBoostedRegressor;
pub use onnx_predictor::OnnxRegressor;
pub use predictor::Regressor;
pub use registry::{ModelPaths, ModelRegistry, TextScorer, load_all_models};
pub use scaler::FeatureScaler;
