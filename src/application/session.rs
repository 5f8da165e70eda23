//! Per-session cache of the latest analysis.
//!
//! A run always clears the previous report first, and only a fully successful
//! run is stored.

use crate::application::market_data::PriceVolatilityService;
use crate::application::pipeline::ReactionPredictor;
use crate::domain::errors::PipelineError;
use crate::domain::types::{
    Estimate, Explanation, PredictionRequest, PricePoint, VolatilitySample,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Everything produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub request: PredictionRequest,
    pub estimate: Estimate,
    pub explanation: Option<Explanation>,
    pub volatility: VolatilitySample,
    pub recent_history: Vec<PricePoint>,
}

pub struct AnalysisSession {
    predictor: Arc<ReactionPredictor>,
    prices: Arc<PriceVolatilityService>,
    last: RwLock<Option<AnalysisReport>>,
}

impl AnalysisSession {
    pub fn new(predictor: Arc<ReactionPredictor>, prices: Arc<PriceVolatilityService>) -> Self {
        Self {
            predictor,
            prices,
            last: RwLock::new(None),
        }
    }

    /// Run the full analysis. Volatility and history degrade silently; the
    /// estimate does not.
    pub async fn analyze(
        &self,
        request: PredictionRequest,
        with_explanation: bool,
    ) -> Result<AnalysisReport, PipelineError> {
        *self.last.write().await = None;

        let (estimate, explanation) = if with_explanation {
            let explained = self.predictor.estimate_with_explanation(&request).await?;
            (explained.estimate, Some(explained.explanation))
        } else {
            (self.predictor.estimate(&request).await?, None)
        };

        let (volatility, recent_history) = tokio::join!(
            self.prices
                .volatility(&request.ticker, request.start_date, request.end_date()),
            self.prices.recent_history(&request.ticker, request.start_date),
        );

        let report = AnalysisReport {
            request,
            estimate,
            explanation,
            volatility,
            recent_history,
        };
        info!(
            "Analysis for {}: {} ({:+.2}%), volatility {:.3}%",
            report.request.ticker,
            report.estimate.signal(),
            report.estimate.percent(),
            report.volatility.percent()
        );

        *self.last.write().await = Some(report.clone());
        Ok(report)
    }

    pub async fn last_report(&self) -> Option<AnalysisReport> {
        self.last.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.last.write().await = None;
    }
}
