//! Process-lifetime holder of the three frozen artifacts.

use super::embedding::{StaticEmbedder, TextEmbedder};
use super::feature_builder::{FeatureBuilder, FeatureVector, ScaledNumeric};
use super::gradient_boosting::GradientBoostedRegressor;
use super::onnx_predictor::OnnxRegressor;
use super::predictor::Regressor;
use super::scaler::FeatureScaler;
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{NUMERIC_FEATURE_NAMES, NumericContext};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Locations of the three artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPaths {
    pub scaler: PathBuf,
    pub regressor: PathBuf,
    pub embedding: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(dir: impl AsRef<Path>, scaler: &str, regressor: &str, embedding: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler: dir.join(scaler),
            regressor: dir.join(regressor),
            embedding: dir.join(embedding),
        }
    }
}

/// Load scaler, regression model and embedding model, and check they agree
/// on vector widths.
pub fn load_all_models(paths: &ModelPaths) -> Result<ModelRegistry, PipelineError> {
    let scaler = FeatureScaler::load(&paths.scaler)?;
    let embedder = StaticEmbedder::load(&paths.embedding)?;

    let is_onnx = paths
        .regressor
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("onnx"));

    let regressor: Box<dyn Regressor> = if is_onnx {
        Box::new(OnnxRegressor::load(
            &paths.regressor,
            embedder.dim() + scaler.width(),
        )?)
    } else {
        Box::new(GradientBoostedRegressor::load(&paths.regressor)?)
    };

    ModelRegistry::new(scaler, regressor, Box::new(embedder))
}

/// Immutable bundle of the loaded models. Share it by reference (`Arc`).
pub struct ModelRegistry {
    scaler: FeatureScaler,
    regressor: Box<dyn Regressor>,
    embedder: Box<dyn TextEmbedder>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("scaler", &self.scaler.kind())
            .field("regressor", &self.regressor.name())
            .field("embedder", &self.embedder.name())
            .field("feature_dim", &self.feature_dim())
            .finish()
    }
}

impl ModelRegistry {
    pub fn new(
        scaler: FeatureScaler,
        regressor: Box<dyn Regressor>,
        embedder: Box<dyn TextEmbedder>,
    ) -> Result<Self, PipelineError> {
        if scaler.width() != NUMERIC_FEATURE_NAMES.len() {
            return Err(PipelineError::artifact(
                "scaler",
                format!(
                    "scaler has {} columns, numeric features are {:?}",
                    scaler.width(),
                    NUMERIC_FEATURE_NAMES
                ),
            ));
        }
        if let Some(names) = scaler.feature_names()
            && names.iter().map(String::as_str).ne(NUMERIC_FEATURE_NAMES.iter().copied())
        {
            return Err(PipelineError::artifact(
                "scaler",
                format!("scaler columns {:?} do not match {:?}", names, NUMERIC_FEATURE_NAMES),
            ));
        }

        let expected = embedder.dim() + scaler.width();
        if regressor.num_features() != expected {
            return Err(PipelineError::artifact(
                "regression model",
                format!(
                    "model takes {} inputs but embedding_dim {} + num_feat_dim {} = {}",
                    regressor.num_features(),
                    embedder.dim(),
                    scaler.width(),
                    expected
                ),
            ));
        }

        info!(
            "Model registry ready: {} + {} ({} + {} features)",
            embedder.name(),
            regressor.name(),
            embedder.dim(),
            scaler.width()
        );

        Ok(Self {
            scaler,
            regressor,
            embedder,
        })
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn num_feat_dim(&self) -> usize {
        self.scaler.width()
    }

    pub fn feature_dim(&self) -> usize {
        self.regressor.num_features()
    }

    pub fn regressor_name(&self) -> &str {
        self.regressor.name()
    }

    pub fn feature_builder(&self) -> FeatureBuilder<'_> {
        FeatureBuilder::new(self.embedder.as_ref(), &self.scaler, self.feature_dim())
    }

    pub fn build_features(
        &self,
        headline: &str,
        context: &NumericContext,
    ) -> Result<FeatureVector, PipelineError> {
        self.feature_builder().build(headline, context)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError> {
        let value = self.regressor.predict(features.as_slice())?;
        ensure_finite(value)
    }

    /// Prepare the batched `predict_texts` callback with the numeric context fixed.
    pub fn text_scorer(&self, context: &NumericContext) -> Result<TextScorer<'_>, PipelineError> {
        let numeric = self.feature_builder().scale_numeric(context)?;
        Ok(TextScorer {
            registry: self,
            numeric,
        })
    }
}

fn ensure_finite(value: f64) -> Result<f64, PipelineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PipelineError::inference(format!(
            "model returned non-finite value {}",
            value
        )))
    }
}

/// Scores many texts against one fixed numeric context.
pub struct TextScorer<'a> {
    registry: &'a ModelRegistry,
    numeric: ScaledNumeric,
}

impl TextScorer<'_> {
    pub fn predict_texts(&self, texts: &[String]) -> Result<Vec<f64>, PipelineError> {
        let builder = self.registry.feature_builder();
        let rows = texts
            .par_iter()
            .map(|text| {
                builder
                    .build_with_scaled(text, &self.numeric)
                    .map(FeatureVector::into_inner)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Scoring batch of {} texts", rows.len());
        let predictions = self.registry.regressor.predict_batch(&rows)?;
        predictions.into_iter().map(ensure_finite).collect()
    }
}
