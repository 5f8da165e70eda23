use super::perturbation::{distances, kernel_weights, presence, sample_masks};
use super::surrogate::{
    SURROGATE_ALPHA, fit_weighted_ridge, forward_selection, highest_weights,
};
use super::tokenize::IndexedText;
use crate::application::ml::TextScorer;
use crate::domain::errors::PipelineError;
use crate::domain::types::{Contribution, Explanation};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Largest `num_features` for which `auto` uses forward selection.
const AUTO_FORWARD_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    #[default]
    Auto,
    ForwardSelection,
    HighestWeights,
    None,
}

impl FromStr for FeatureSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(FeatureSelection::Auto),
            "forward_selection" | "forward" => Ok(FeatureSelection::ForwardSelection),
            "highest_weights" | "highest" => Ok(FeatureSelection::HighestWeights),
            "none" => Ok(FeatureSelection::None),
            other => Err(format!(
                "unknown feature selection '{}' (expected auto, forward_selection, highest_weights or none)",
                other
            )),
        }
    }
}

impl fmt::Display for FeatureSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureSelection::Auto => "auto",
            FeatureSelection::ForwardSelection => "forward_selection",
            FeatureSelection::HighestWeights => "highest_weights",
            FeatureSelection::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainerConfig {
    pub num_samples: usize,
    pub num_features: usize,
    pub kernel_width: f64,
    pub seed: u64,
    pub feature_selection: FeatureSelection,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            num_samples: 5000,
            num_features: 10,
            kernel_width: 25.0,
            seed: 42,
            feature_selection: FeatureSelection::Auto,
        }
    }
}

/// Scores a batch of texts, returning one prediction per text in input order.
pub trait BatchScorer: Sync {
    fn score_batch(&self, texts: &[String]) -> Result<Vec<f64>, PipelineError>;
}

impl BatchScorer for TextScorer<'_> {
    fn score_batch(&self, texts: &[String]) -> Result<Vec<f64>, PipelineError> {
        self.predict_texts(texts)
    }
}

/// Explain the scorer's output for `headline` with a local linear surrogate.
///
/// A headline without words returns an empty explanation without scoring.
pub fn explain<S: BatchScorer + ?Sized>(
    headline: &str,
    scorer: &S,
    config: &ExplainerConfig,
) -> Result<Explanation, PipelineError> {
    let text = IndexedText::new(headline);
    let num_words = text.num_words();
    if num_words == 0 || config.num_features == 0 {
        debug!("Nothing to explain in headline {:?}", headline);
        return Ok(Explanation::empty());
    }

    let masks = sample_masks(num_words, config.num_samples, config.seed);
    let texts: Vec<String> = masks
        .rows()
        .into_iter()
        .map(|row| text.render(&presence(row)))
        .collect();

    let scores = scorer.score_batch(&texts)?;
    if scores.len() != texts.len() {
        return Err(PipelineError::inference(format!(
            "scorer returned {} predictions for {} texts",
            scores.len(),
            texts.len()
        )));
    }
    let y = Array1::from(scores);
    let weights = kernel_weights(&distances(&masks), config.kernel_width);

    let selected = select(config, &masks, &y, &weights);
    let sub = masks.select(Axis(1), &selected);
    let fit = fit_weighted_ridge(&sub.view(), &y, &weights, SURROGATE_ALPHA);
    let score = fit.score(&sub.view(), &y, &weights);
    let local_prediction = fit.predict(&sub.slice(ndarray::s![0..1, ..]))[0];

    let mut contributions: Vec<Contribution> = selected
        .iter()
        .zip(fit.coefficients.iter())
        .map(|(&idx, &weight)| Contribution::new(text.word(idx), weight))
        .collect();
    contributions.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
    contributions.truncate(config.num_features);

    debug!(
        "Explained {} words with {} samples (R² {:.3})",
        num_words,
        texts.len(),
        score
    );

    Ok(Explanation {
        contributions,
        intercept: fit.intercept,
        score,
        local_prediction,
        num_samples: texts.len(),
    })
}

fn select(
    config: &ExplainerConfig,
    masks: &ndarray::Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
) -> Vec<usize> {
    let k = config.num_features;
    match config.feature_selection {
        FeatureSelection::None => (0..masks.ncols()).collect(),
        FeatureSelection::ForwardSelection => forward_selection(masks, y, weights, k),
        FeatureSelection::HighestWeights => highest_weights(masks, y, weights, k),
        FeatureSelection::Auto if k <= AUTO_FORWARD_LIMIT => {
            forward_selection(masks, y, weights, k)
        }
        FeatureSelection::Auto => highest_weights(masks, y, weights, k),
    }
}
