//! Volatility and recent-history lookups for display.
//!
//! Both outputs are supplementary: every failure degrades to a neutral value
//! (0.0 volatility, empty history) with a warning, never an error.

use super::volatility::{bounded_volatility, usable_closes};
use crate::domain::errors::MarketDataError;
use crate::domain::ports::MarketDataService;
use crate::domain::types::{
    LOOKBACK_DAYS, PricePoint, RECENT_HISTORY_LEN, VolatilitySample,
};
use crate::infrastructure::observability::Metrics;
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fetch daily closes, bounded by `timeout`.
pub async fn fetch_closes(
    market: &dyn MarketDataService,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    timeout: Duration,
) -> Result<Vec<PricePoint>, MarketDataError> {
    match tokio::time::timeout(timeout, market.get_daily_closes(ticker, start, end)).await {
        Ok(result) => result,
        Err(_) => Err(MarketDataError::Timeout {
            duration_ms: timeout.as_millis() as u64,
        }),
    }
}

pub struct PriceVolatilityService {
    market: Arc<dyn MarketDataService>,
    timeout: Duration,
    metrics: Option<Metrics>,
}

impl PriceVolatilityService {
    pub fn new(market: Arc<dyn MarketDataService>, timeout: Duration) -> Self {
        Self {
            market,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Annualised volatility of `ticker` over `[start, end)`, in `[0, 1]`.
    /// Returns 0.0 when it cannot be computed.
    pub async fn vol(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> f64 {
        self.volatility(ticker, start, end).await.value
    }

    pub async fn volatility(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> VolatilitySample {
        let started = Instant::now();
        let sample = match fetch_closes(self.market.as_ref(), ticker, start, end, self.timeout).await
        {
            Ok(points) => {
                let raw: Vec<f64> = points.iter().map(|p| p.close).collect();
                let closes = usable_closes(&raw);
                match bounded_volatility(&closes) {
                    Some(value) => VolatilitySample {
                        value,
                        observations: closes.len(),
                        available: true,
                    },
                    None => {
                        warn!(
                            "Volatility unavailable for {} ({} closes between {} and {})",
                            ticker,
                            closes.len(),
                            start,
                            end
                        );
                        VolatilitySample {
                            observations: closes.len(),
                            ..VolatilitySample::unavailable()
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Volatility fetch failed for {}: {}", ticker, e);
                self.record_failure();
                VolatilitySample::unavailable()
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.observe_stage("volatility", started.elapsed().as_secs_f64());
            metrics.last_volatility.set(sample.value);
        }
        debug!(
            "Volatility for {}: {:.4} from {} closes",
            ticker, sample.value, sample.observations
        );
        sample
    }

    /// Last closes inside the lookback window ending the day before `start_date`.
    pub async fn recent_history(&self, ticker: &str, start_date: NaiveDate) -> Vec<PricePoint> {
        let from = start_date - ChronoDuration::days(LOOKBACK_DAYS);
        match fetch_closes(self.market.as_ref(), ticker, from, start_date, self.timeout).await {
            Ok(mut points) => {
                let skip = points.len().saturating_sub(RECENT_HISTORY_LEN);
                points.drain(..skip);
                points
            }
            Err(e) => {
                warn!("Recent history unavailable for {}: {}", ticker, e);
                self.record_failure();
                Vec::new()
            }
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_market_data_failures("volatility");
        }
    }
}
