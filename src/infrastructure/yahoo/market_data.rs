use super::common::ChartEnvelope;
use crate::domain::errors::MarketDataError;
use crate::domain::ports::MarketDataService;
use crate::domain::types::PricePoint;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, error, trace};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_TICKER_SUFFIX: &str = ".JK";

const PROVIDER: &str = "yahoo";

// ===== Market Data Service (chart API) =====

pub struct YahooMarketDataService {
    client: ClientWithMiddleware,
    base_url: String,
    ticker_suffix: String,
    bar_cache: RwLock<HashMap<String, Vec<PricePoint>>>,
}

impl YahooMarketDataService {
    pub fn new(base_url: String, ticker_suffix: String, request_timeout: Duration) -> Self {
        Self::builder()
            .base_url(base_url)
            .ticker_suffix(ticker_suffix)
            .request_timeout(request_timeout)
            .build()
    }

    pub fn builder() -> YahooMarketDataServiceBuilder {
        YahooMarketDataServiceBuilder::default()
    }

    /// Exchange symbol for a bare ticker (`BBRI` -> `BBRI.JK`). Tickers that
    /// already carry an exchange or index marker are left alone.
    pub fn yahoo_symbol(&self, ticker: &str) -> String {
        let ticker = ticker.trim().to_uppercase();
        if self.ticker_suffix.is_empty() || ticker.contains(['.', '^', '=']) {
            ticker
        } else {
            format!("{}{}", ticker, self.ticker_suffix)
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let period2 = end.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(MarketDataError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("cannot convert window {}..{} to timestamps", start, end),
            });
        };

        let url = build_url_with_query(
            &self.base_url,
            &format!("v8/finance/chart/{}", symbol),
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ],
        )
        .map_err(|e| request_error(format!("invalid URL for {}: {}", symbol, e)))?;

        debug!("YahooMarketDataService: GET {}", url);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| request_error(format!("request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("YahooMarketDataService: {} not found", symbol);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "YahooMarketDataService: API error {} for {}: {}",
                status, symbol, error_text
            );
            return Err(request_error(format!("HTTP {} for {}", status, symbol)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(format!("reading body for {} failed: {}", symbol, e)))?;

        let points = parse_chart_response(symbol, &body)?;
        Ok(points
            .into_iter()
            .filter(|p| p.date >= start && p.date < end)
            .collect())
    }
}

fn request_error(reason: String) -> MarketDataError {
    MarketDataError::Request {
        provider: PROVIDER.to_string(),
        reason,
    }
}

/// A window is final once its exclusive end is no later than today; later
/// windows can still gain closes.
fn is_settled_window(end: NaiveDate, today: NaiveDate) -> bool {
    end <= today
}

/// Parse a `/v8/finance/chart` body into ascending daily closes.
///
/// Timestamps are shifted by the exchange's `gmtoffset` before taking the
/// calendar date. Null closes (halted days) are skipped. A `null` result is
/// an unknown symbol and yields an empty series.
pub fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<PricePoint>, MarketDataError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidData {
            symbol: symbol.to_string(),
            reason: format!("malformed chart response: {}", e),
        })?;

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        if let Some(err) = envelope.chart.error {
            debug!(
                "YahooMarketDataService: no result for {} ({}: {})",
                symbol, err.code, err.description
            );
        }
        return Ok(Vec::new());
    };

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() < timestamps.len() {
        return Err(MarketDataError::InvalidData {
            symbol: symbol.to_string(),
            reason: format!(
                "{} timestamps but {} closes",
                timestamps.len(),
                closes.len()
            ),
        });
    }

    let mut points: Vec<PricePoint> = timestamps
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PricePoint { date, close })
        })
        .collect();

    points.sort_by_key(|p| p.date);
    // Intraday refreshes can repeat the current session; keep the last.
    points.reverse();
    points.dedup_by_key(|p| p.date);
    points.reverse();
    Ok(points)
}

#[async_trait]
impl MarketDataService for YahooMarketDataService {
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        if start >= end {
            return Ok(Vec::new());
        }

        let symbol = self.yahoo_symbol(ticker);
        let cache_key = format!("{}:{}:{}", symbol, start, end);

        {
            let cache = match self.bar_cache.read() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    error!("YahooMarketDataService: bar_cache lock poisoned during read, recovering");
                    poisoned.into_inner()
                }
            };
            if let Some(points) = cache.get(&cache_key) {
                trace!("YahooMarketDataService: Cache HIT for {}", cache_key);
                return Ok(points.clone());
            }
        }

        debug!(
            "YahooMarketDataService: Cache MISS for {}. Fetching...",
            cache_key
        );
        let points = self.fetch_chart(&symbol, start, end).await?;

        if !is_settled_window(end, Utc::now().date_naive()) {
            debug!(
                "YahooMarketDataService: {} reaches past today, not caching",
                cache_key
            );
            return Ok(points);
        }

        {
            let mut cache = match self.bar_cache.write() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    error!("YahooMarketDataService: bar_cache lock poisoned during write, recovering");
                    poisoned.into_inner()
                }
            };
            cache.insert(cache_key, points.clone());
        }

        Ok(points)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[derive(Default)]
pub struct YahooMarketDataServiceBuilder {
    base_url: Option<String>,
    ticker_suffix: Option<String>,
    request_timeout: Option<Duration>,
}

impl YahooMarketDataServiceBuilder {
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn ticker_suffix(mut self, ticker_suffix: String) -> Self {
        self.ticker_suffix = Some(ticker_suffix);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> YahooMarketDataService {
        let request_timeout = self.request_timeout.unwrap_or(Duration::from_secs(10));
        YahooMarketDataService {
            client: HttpClientFactory::create_client(request_timeout),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ticker_suffix: self
                .ticker_suffix
                .unwrap_or_else(|| DEFAULT_TICKER_SUFFIX.to_string()),
            bar_cache: RwLock::new(HashMap::new()),
        }
    }
}
