//! Prometheus metrics definitions for newsreact
//!
//! All metrics use the `newsreact_` prefix.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the prediction pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Predictions by entry point and outcome
    pub predictions_total: CounterVec,
    /// Market data failures by path (prediction or volatility)
    pub market_data_failures_total: CounterVec,
    /// Perturbed texts scored by the explainer
    pub perturbations_scored_total: CounterVec,
    /// Stage latency in seconds
    pub stage_latency_seconds: HistogramVec,
    /// Last volatility reading (0-1)
    pub last_volatility: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                "newsreact_predictions_total",
                "Total predictions by entry point and outcome",
            ),
            &["mode", "outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let market_data_failures_total = CounterVec::new(
            Opts::new(
                "newsreact_market_data_failures_total",
                "Market data fetches that failed or timed out",
            ),
            &["path"],
        )?;
        registry.register(Box::new(market_data_failures_total.clone()))?;

        let perturbations_scored_total = CounterVec::new(
            Opts::new(
                "newsreact_perturbations_scored_total",
                "Perturbed headlines scored by the explainer",
            ),
            &["regressor"],
        )?;
        registry.register(Box::new(perturbations_scored_total.clone()))?;

        let stage_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "newsreact_stage_latency_seconds",
                "Pipeline stage latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["stage"],
        )?;
        registry.register(Box::new(stage_latency_seconds.clone()))?;

        let last_volatility = Gauge::with_opts(Opts::new(
            "newsreact_last_volatility",
            "Most recent annualised volatility reading (0-1)",
        ))?;
        registry.register(Box::new(last_volatility.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            market_data_failures_total,
            perturbations_scored_total,
            stage_latency_seconds,
            last_volatility,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_predictions(&self, mode: &str, outcome: &str) {
        self.predictions_total
            .with_label_values(&[mode, outcome])
            .inc();
    }

    pub fn inc_market_data_failures(&self, path: &str) {
        self.market_data_failures_total
            .with_label_values(&[path])
            .inc();
    }

    pub fn add_perturbations(&self, regressor: &str, count: usize) {
        self.perturbations_scored_total
            .with_label_values(&[regressor])
            .inc_by(count as f64);
    }

    /// Observe stage latency
    pub fn observe_stage(&self, stage: &str, seconds: f64) {
        self.stage_latency_seconds
            .with_label_values(&[stage])
            .observe(seconds);
    }
}
