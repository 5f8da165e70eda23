//! Headline + ticker → estimated short-horizon price reaction.

use crate::application::explain::{ExplainerConfig, explain};
use crate::application::market_data::fetch_closes;
use crate::application::ml::ModelRegistry;
use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::NumericContext;
use crate::domain::ports::MarketDataService;
use crate::domain::types::{Estimate, ExplainedEstimate, PredictionRequest};
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub struct ReactionPredictor {
    registry: Arc<ModelRegistry>,
    market: Arc<dyn MarketDataService>,
    explainer: ExplainerConfig,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl ReactionPredictor {
    pub fn new(
        registry: Arc<ModelRegistry>,
        market: Arc<dyn MarketDataService>,
        explainer: ExplainerConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            market,
            explainer,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn explainer_config(&self) -> &ExplainerConfig {
        &self.explainer
    }

    /// Point estimate of the fractional price change.
    pub async fn predict_headline_with_ticker(
        &self,
        request: &PredictionRequest,
    ) -> Result<f64, PipelineError> {
        self.estimate(request).await.map(|e| e.change)
    }

    pub async fn estimate(&self, request: &PredictionRequest) -> Result<Estimate, PipelineError> {
        let span = info_span!("estimate", request_id = %Uuid::new_v4(), ticker = %request.ticker);
        let result = async {
            let context = self.market_context(request).await?;
            self.score(request, &context)
        }
        .instrument(span)
        .await;

        self.record("estimate", &result);
        result
    }

    /// Estimate plus word contributions. Pays for the perturbation loop.
    pub async fn estimate_with_explanation(
        &self,
        request: &PredictionRequest,
    ) -> Result<ExplainedEstimate, PipelineError> {
        let span = info_span!("explain", request_id = %Uuid::new_v4(), ticker = %request.ticker);
        let result = async {
            let context = self.market_context(request).await?;
            let estimate = self.score(request, &context)?;

            let started = Instant::now();
            let registry = self.registry.clone();
            let headline = request.headline.clone();
            let config = self.explainer.clone();
            // The perturbation loop is CPU bound and fans out on rayon.
            let explanation = tokio::task::spawn_blocking(move || {
                let scorer = registry.text_scorer(&context)?;
                explain(&headline, &scorer, &config)
            })
            .await
            .map_err(|e| PipelineError::inference(format!("explanation task failed: {}", e)))??;
            self.observe("explain", started);
            if let Some(metrics) = &self.metrics {
                metrics.add_perturbations(self.registry.regressor_name(), explanation.num_samples);
            }

            info!(
                "Explained estimate {:+.4} with {} words (R² {:.3})",
                estimate.change,
                explanation.contributions.len(),
                explanation.score
            );
            Ok::<_, PipelineError>(ExplainedEstimate {
                estimate,
                explanation,
            })
        }
        .instrument(span)
        .await;

        self.record("explain", &result);
        result
    }

    /// Numeric context from the lookback window before the news date.
    pub async fn market_context(
        &self,
        request: &PredictionRequest,
    ) -> Result<NumericContext, PipelineError> {
        let started = Instant::now();
        let history = fetch_closes(
            self.market.as_ref(),
            &request.ticker,
            request.lookback_start(),
            request.start_date,
            self.timeout,
        )
        .await
        .map_err(|e| {
            warn!("Market data fetch failed for {}: {}", request.ticker, e);
            self.count_failure();
            PipelineError::market_data(&request.ticker, e)
        })?;
        self.observe("context", started);

        NumericContext::from_history(request.price_before, &history).ok_or_else(|| {
            self.count_failure();
            PipelineError::market_data(
                &request.ticker,
                format!(
                    "no closes between {} and {} from {}",
                    request.lookback_start(),
                    request.start_date,
                    self.market.name()
                ),
            )
        })
    }

    fn score(
        &self,
        request: &PredictionRequest,
        context: &NumericContext,
    ) -> Result<Estimate, PipelineError> {
        let started = Instant::now();
        let features = self.registry.build_features(&request.headline, context)?;
        let change = self.registry.predict(&features)?;
        self.observe("predict", started);

        info!(
            "Estimated {:+.4} for {} ({} features)",
            change,
            request.ticker,
            features.len()
        );
        Ok(Estimate::new(change))
    }

    fn observe(&self, stage: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.observe_stage(stage, started.elapsed().as_secs_f64());
        }
    }

    fn count_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_market_data_failures("prediction");
        }
    }

    fn record<T>(&self, mode: &str, result: &Result<T, PipelineError>) {
        if let Some(metrics) = &self.metrics {
            let outcome = match result {
                Ok(_) => "ok",
                Err(PipelineError::MarketDataUnavailable { .. }) => "no_market_data",
                Err(PipelineError::InvalidRequest { .. }) => "invalid_request",
                Err(e) if e.is_fatal() => "model_error",
                Err(_) => "inference_error",
            };
            metrics.inc_predictions(mode, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::{FeatureScaler, Regressor, StaticEmbedder};
    use crate::domain::types::PricePoint;
    use crate::infrastructure::mock::MockMarketDataService;
    use chrono::NaiveDate;

    /// Embedding coordinate 0 plus a small share of the last-close gap.
    struct LinearModel;

    impl Regressor for LinearModel {
        fn predict(&self, features: &[f32]) -> Result<f64, PipelineError> {
            Ok(0.02 * features[0] as f64 + 0.1 * features[3] as f64)
        }
        fn num_features(&self) -> usize {
            6
        }
        fn name(&self) -> &str {
            "linear"
        }
    }

    fn registry() -> Arc<ModelRegistry> {
        let embedder = StaticEmbedder::new(
            vec!["profit".into(), "loss".into()],
            vec![vec![1.0, 0.0], vec![-1.0, 0.0]],
            2,
            false,
            true,
        )
        .unwrap();
        let scaler = FeatureScaler::standard(vec![0.0; 4], vec![1.0; 4]).unwrap();
        Arc::new(ModelRegistry::new(scaler, Box::new(LinearModel), Box::new(embedder)).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn market() -> Arc<dyn MarketDataService> {
        let points = (1..=10)
            .map(|d| PricePoint {
                date: date(2024, 4, d),
                close: 1000.0,
            })
            .collect();
        Arc::new(MockMarketDataService::new().with_series("BBRI", points))
    }

    fn predictor() -> ReactionPredictor {
        ReactionPredictor::new(
            registry(),
            market(),
            ExplainerConfig {
                num_samples: 300,
                ..ExplainerConfig::default()
            },
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_estimate_uses_headline_and_context() {
        let p = predictor();
        let positive = PredictionRequest::new("record profit", "BBRI", 1000.0, date(2024, 4, 11)).unwrap();
        let negative = PredictionRequest::new("heavy loss", "BBRI", 1000.0, date(2024, 4, 11)).unwrap();

        let up = p.estimate(&positive).await.unwrap();
        let down = p.estimate(&negative).await.unwrap();
        assert!((up.change - 0.02).abs() < 1e-9);
        assert!((down.change + 0.02).abs() < 1e-9);

        let gap = PredictionRequest::new("record profit", "BBRI", 1100.0, date(2024, 4, 11)).unwrap();
        let with_gap = p.predict_headline_with_ticker(&gap).await.unwrap();
        assert!((with_gap - 0.03).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_ticker_is_market_data_error() {
        let metrics = Metrics::new().unwrap();
        let p = predictor().with_metrics(metrics.clone());
        let request = PredictionRequest::new("record profit", "ZZZZ", 1000.0, date(2024, 4, 11)).unwrap();

        let err = p.estimate(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::MarketDataUnavailable { .. }));
        assert!(metrics.render().contains("outcome=\"no_market_data\""));
    }

    #[tokio::test]
    async fn test_explanation_ranks_driving_word() {
        let p = predictor();
        let request =
            PredictionRequest::new("company posts profit today", "BBRI", 1000.0, date(2024, 4, 11)).unwrap();

        let result = p.estimate_with_explanation(&request).await.unwrap();
        assert!((result.estimate.change - 0.02).abs() < 1e-9);
        assert_eq!(result.explanation.contributions[0].word, "profit");
        assert!(result.explanation.contributions[0].weight > 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_explanations_on_worker_pool() {
        let p = Arc::new(predictor());
        let handles: Vec<_> = ["profit", "loss", "profit again"]
            .into_iter()
            .map(|headline| {
                let p = p.clone();
                tokio::spawn(async move {
                    let request =
                        PredictionRequest::new(headline, "BBRI", 1000.0, date(2024, 4, 11)).unwrap();
                    p.estimate_with_explanation(&request).await
                })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert_eq!(result.explanation.num_samples, 300);
        }
    }
}
