use super::embedding::TextEmbedder;
use super::scaler::FeatureScaler;
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::NumericContext;

/// Model input: `[embedding (embedding_dim) | scaled numeric (num_feat_dim)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
    embedding_dim: usize,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn embedding(&self) -> &[f32] {
        &self.values[..self.embedding_dim]
    }

    pub fn numeric(&self) -> &[f32] {
        &self.values[self.embedding_dim..]
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// Assembles feature vectors. Numeric inputs always pass through the scaler.
pub struct FeatureBuilder<'a> {
    embedder: &'a dyn TextEmbedder,
    scaler: &'a FeatureScaler,
    expected_width: usize,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(
        embedder: &'a dyn TextEmbedder,
        scaler: &'a FeatureScaler,
        expected_width: usize,
    ) -> Self {
        Self {
            embedder,
            scaler,
            expected_width,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedder.dim()
    }

    pub fn num_feat_dim(&self) -> usize {
        self.scaler.width()
    }

    /// Scale the numeric context once so it can be reused across many texts.
    pub fn scale_numeric(&self, context: &NumericContext) -> Result<ScaledNumeric, PipelineError> {
        let scaled = self.scaler.transform(&context.to_vector())?;
        Ok(ScaledNumeric(scaled.into_iter().map(|v| v as f32).collect()))
    }

    pub fn build(
        &self,
        headline: &str,
        context: &NumericContext,
    ) -> Result<FeatureVector, PipelineError> {
        let numeric = self.scale_numeric(context)?;
        self.build_with_scaled(headline, &numeric)
    }

    pub fn build_with_scaled(
        &self,
        headline: &str,
        numeric: &ScaledNumeric,
    ) -> Result<FeatureVector, PipelineError> {
        let embedding = self.embedder.embed(headline);
        if embedding.len() != self.embedder.dim() {
            return Err(PipelineError::FeatureDimension {
                expected: self.embedder.dim(),
                actual: embedding.len(),
            });
        }

        let embedding_dim = embedding.len();
        let mut values = embedding;
        values.extend_from_slice(&numeric.0);

        if values.len() != self.expected_width {
            return Err(PipelineError::FeatureDimension {
                expected: self.expected_width,
                actual: values.len(),
            });
        }

        Ok(FeatureVector {
            values,
            embedding_dim,
        })
    }
}

/// Numeric block after the scaler transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledNumeric(Vec<f32>);

impl ScaledNumeric {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}
