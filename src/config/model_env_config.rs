//! Model artifact locations.

use super::{VarSource, var_or};
use crate::application::ml::ModelPaths;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub model_dir: PathBuf,
    pub scaler_file: String,
    pub regressor_file: String,
    pub embedding_file: String,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            scaler_file: "scaler.json".to_string(),
            regressor_file: "xgb_model.json".to_string(),
            embedding_file: "embedding.json".to_string(),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_source(source: VarSource<'_>) -> Self {
        let defaults = Self::default();
        Self {
            model_dir: PathBuf::from(var_or(source, "MODEL_DIR", "models")),
            scaler_file: var_or(source, "SCALER_FILE", &defaults.scaler_file),
            regressor_file: var_or(source, "REGRESSOR_FILE", &defaults.regressor_file),
            embedding_file: var_or(source, "EMBEDDING_FILE", &defaults.embedding_file),
        }
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths::in_dir(
            &self.model_dir,
            &self.scaler_file,
            &self.regressor_file,
            &self.embedding_file,
        )
    }
}
