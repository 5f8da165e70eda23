//! Explainer sampling parameters.

use super::{VarSource, parse_var, var_or};
use crate::application::explain::{ExplainerConfig, FeatureSelection};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct ExplainerEnvConfig {
    pub num_samples: usize,
    pub num_features: usize,
    pub kernel_width: f64,
    pub seed: u64,
    pub feature_selection: FeatureSelection,
}

impl ExplainerEnvConfig {
    pub fn from_source(source: VarSource<'_>) -> Result<Self> {
        let defaults = ExplainerConfig::default();

        let num_samples = parse_var(source, "EXPLAIN_NUM_SAMPLES", defaults.num_samples)?;
        if num_samples < 2 {
            anyhow::bail!("EXPLAIN_NUM_SAMPLES must be at least 2, got {}", num_samples);
        }
        let kernel_width = parse_var(source, "EXPLAIN_KERNEL_WIDTH", defaults.kernel_width)?;
        if !(kernel_width.is_finite() && kernel_width > 0.0) {
            anyhow::bail!("EXPLAIN_KERNEL_WIDTH must be positive, got {}", kernel_width);
        }
        let feature_selection = var_or(source, "EXPLAIN_FEATURE_SELECTION", "auto")
            .parse::<FeatureSelection>()
            .map_err(|e| anyhow::anyhow!("Failed to parse EXPLAIN_FEATURE_SELECTION: {}", e))?;

        Ok(Self {
            num_samples,
            num_features: parse_var(source, "EXPLAIN_NUM_FEATURES", defaults.num_features)?,
            kernel_width,
            seed: parse_var(source, "EXPLAIN_SEED", defaults.seed)?,
            feature_selection,
        })
    }

    pub fn to_explainer_config(&self) -> ExplainerConfig {
        ExplainerConfig {
            num_samples: self.num_samples,
            num_features: self.num_features,
            kernel_width: self.kernel_width,
            seed: self.seed,
            feature_selection: self.feature_selection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = ExplainerEnvConfig::from_source(&|k| match k {
            "EXPLAIN_NUM_FEATURES" => Some("5".to_string()),
            "EXPLAIN_FEATURE_SELECTION" => Some("highest_weights".to_string()),
            "EXPLAIN_KERNEL_WIDTH" => Some("12.5".to_string()),
            _ => None,
        })
        .unwrap();
        let explainer = config.to_explainer_config();
        assert_eq!(explainer.num_features, 5);
        assert_eq!(explainer.kernel_width, 12.5);
        assert_eq!(explainer.feature_selection, FeatureSelection::HighestWeights);
        assert_eq!(explainer.num_samples, 5000);
    }

    #[test]
    fn test_bad_selection_rejected() {
        let result = ExplainerEnvConfig::from_source(&|k| {
            (k == "EXPLAIN_FEATURE_SELECTION").then(|| "lasso".to_string())
        });
        assert!(result.is_err());
    }
}
