//! Numeric feature scaler exported from scikit-learn.

use crate::domain::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const ARTIFACT: &str = "scaler";

/// Fitted scaler parameters.
///
/// Zero scale (constant training column) behaves as 1.0, matching scikit-learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_range")]
        feature_range: (f64, f64),
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
}

fn default_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl FeatureScaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, PipelineError> {
        let scaler = FeatureScaler::Standard {
            mean,
            scale,
            feature_names: None,
        };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact(ARTIFACT, format!("{}: {}", path.display(), e)))?;
        let scaler: FeatureScaler =
            serde_json::from_str(&text).map_err(|e| PipelineError::artifact(ARTIFACT, e))?;
        scaler.validate()?;
        info!("Loaded {} scaler from {:?} ({} features)", scaler.kind(), path, scaler.width());
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let (a, b) = match self {
            FeatureScaler::Standard { mean, scale, .. } => (mean.len(), scale.len()),
            FeatureScaler::MinMax {
                data_min, data_max, ..
            } => (data_min.len(), data_max.len()),
        };
        if a == 0 || a != b {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!("parameter vectors have lengths {} and {}", a, b),
            ));
        }
        if let Some(names) = self.feature_names()
            && names.len() != a
        {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!("{} feature names for {} columns", names.len(), a),
            ));
        }
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureScaler::Standard { .. } => "standard",
            FeatureScaler::MinMax { .. } => "min_max",
        }
    }

    pub fn width(&self) -> usize {
        match self {
            FeatureScaler::Standard { mean, .. } => mean.len(),
            FeatureScaler::MinMax { data_min, .. } => data_min.len(),
        }
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            FeatureScaler::Standard { feature_names, .. }
            | FeatureScaler::MinMax { feature_names, .. } => feature_names.as_deref(),
        }
    }

    /// Scale one raw row. The caller guarantees `raw.len() == self.width()`.
    pub fn transform(&self, raw: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if raw.len() != self.width() {
            return Err(PipelineError::FeatureDimension {
                expected: self.width(),
                actual: raw.len(),
            });
        }

        let scaled = match self {
            FeatureScaler::Standard { mean, scale, .. } => raw
                .iter()
                .zip(mean.iter().zip(scale.iter()))
                .map(|(x, (m, s))| (x - m) / non_zero(*s))
                .collect(),
            FeatureScaler::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
                ..
            } => raw
                .iter()
                .zip(data_min.iter().zip(data_max.iter()))
                .map(|(x, (min, max))| (x - min) / non_zero(max - min) * (hi - lo) + lo)
                .collect(),
        };
        Ok(scaled)
    }
}

fn non_zero(value: f64) -> f64 {
    if value == 0.0 { 1.0 } else { value }
}
