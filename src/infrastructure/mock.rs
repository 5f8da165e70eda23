use crate::domain::errors::MarketDataError;
use crate::domain::ports::MarketDataService;
use crate::domain::types::PricePoint;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory daily closes for tests and offline runs.
#[derive(Clone, Default)]
pub struct MockMarketDataService {
    series: Arc<RwLock<HashMap<String, Vec<PricePoint>>>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    synthetic: bool,
}

impl MockMarketDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a series. Points are sorted by date.
    pub fn with_series(self, ticker: &str, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        // Builder runs before the service is shared, so the lock is uncontended.
        if let Ok(mut series) = self.series.try_write() {
            series.insert(ticker.to_uppercase(), points);
        }
        self
    }

    /// Every request for `ticker` fails with a provider error.
    pub fn with_failing_ticker(mut self, ticker: &str) -> Self {
        self.failing.insert(ticker.to_uppercase());
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve generated closes for tickers with no registered series, so
    /// offline runs work for any symbol.
    pub fn with_synthetic_fallback(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub async fn insert_series(&self, ticker: &str, mut points: Vec<PricePoint>) {
        points.sort_by_key(|p| p.date);
        self.series.write().await.insert(ticker.to_uppercase(), points);
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = ticker.to_uppercase();
        if self.failing.contains(&key) {
            return Err(MarketDataError::Request {
                provider: "mock".to_string(),
                reason: format!("simulated failure for {}", key),
            });
        }

        let series = self.series.read().await;
        let points: Vec<PricePoint> = match series.get(&key) {
            Some(all) => all
                .iter()
                .filter(|p| p.date >= start && p.date < end)
                .copied()
                .collect(),
            None if self.synthetic => synthetic_closes(&key, start, end),
            None => Vec::new(),
        };

        debug!(
            "MockMarketDataService: {} closes for {} in [{}, {})",
            points.len(),
            key,
            start,
            end
        );
        Ok(points)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Weekday closes that depend only on `(ticker, date)`, so overlapping
/// windows agree with each other.
fn synthetic_closes(ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    let seed = fnv1a(ticker.as_bytes());
    let base = 500.0 + (seed % 9500) as f64;
    let phase = (seed % 628) as f64 / 100.0;

    start
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .map(|date| {
            let day = date.num_days_from_ce() as u64;
            let mut rng = StdRng::seed_from_u64(seed ^ day.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let drift = (day as f64 / 9.0 + phase).sin() * 0.04;
            let noise: f64 = rng.random_range(-0.01..0.01);
            PricePoint {
                date,
                close: (base * (1.0 + drift + noise)).round(),
            }
        })
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ *b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}
