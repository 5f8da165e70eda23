use thiserror::Error;

/// Errors raised by the prediction pipeline.
///
/// Anything that would corrupt the returned number is surfaced through this
/// type. Supplementary outputs (volatility, chart history) never produce it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to load {artifact} artifact: {reason}")]
    ArtifactLoad { artifact: String, reason: String },

    #[error("Feature dimension mismatch: model expects {expected}, got {actual}")]
    FeatureDimension { expected: usize, actual: usize },

    #[error("No market data for {ticker}: {reason}")]
    MarketDataUnavailable { ticker: String, reason: String },

    #[error("Invalid prediction request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Inference failed: {reason}")]
    Inference { reason: String },
}

impl PipelineError {
    pub fn artifact(artifact: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::ArtifactLoad {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    pub fn market_data(ticker: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::MarketDataUnavailable {
            ticker: ticker.into(),
            reason: reason.to_string(),
        }
    }

    pub fn inference(reason: impl ToString) -> Self {
        PipelineError::Inference {
            reason: reason.to_string(),
        }
    }

    /// Fatal errors come from the artifacts themselves and cannot be fixed by
    /// retrying the same request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::ArtifactLoad { .. } | PipelineError::FeatureDimension { .. }
        )
    }
}

/// Errors reported by market data providers.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Request to {provider} failed: {reason}")]
    Request { provider: String, reason: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("Service timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}
