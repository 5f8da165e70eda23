use crate::domain::errors::PipelineError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed reaction horizon: the estimate covers `start_date .. start_date + 7d`.
pub const REACTION_HORIZON_DAYS: i64 = 7;

/// Calendar days of history fetched before the news date.
pub const LOOKBACK_DAYS: i64 = 14;

/// Number of closes kept for the recent-history chart.
pub const RECENT_HISTORY_LEN: usize = 7;

/// One headline to score against one stock.
///
/// Deserialization goes through [`PredictionRequest::new`], so a decoded
/// request is held to the same rules as a constructed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPredictionRequest")]
pub struct PredictionRequest {
    pub headline: String,
    pub ticker: String,
    pub price_before: f64,
    pub start_date: NaiveDate,
}

#[derive(Deserialize)]
struct RawPredictionRequest {
    headline: String,
    ticker: String,
    price_before: f64,
    start_date: NaiveDate,
}

impl TryFrom<RawPredictionRequest> for PredictionRequest {
    type Error = PipelineError;

    fn try_from(raw: RawPredictionRequest) -> Result<Self, Self::Error> {
        Self::new(raw.headline, raw.ticker, raw.price_before, raw.start_date)
    }
}

impl PredictionRequest {
    pub fn new(
        headline: impl Into<String>,
        ticker: impl Into<String>,
        price_before: f64,
        start_date: NaiveDate,
    ) -> Result<Self, PipelineError> {
        let ticker = ticker.into().trim().to_uppercase();
        if ticker.is_empty() {
            return Err(PipelineError::InvalidRequest {
                reason: "ticker must not be empty".to_string(),
            });
        }
        if !price_before.is_finite() || price_before <= 0.0 {
            return Err(PipelineError::InvalidRequest {
                reason: format!("price_before must be positive, got {}", price_before),
            });
        }

        Ok(Self {
            headline: headline.into(),
            ticker,
            price_before,
            start_date,
        })
    }

    /// End of the reaction window.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(REACTION_HORIZON_DAYS)
    }

    /// First day of the pre-event lookback window.
    pub fn lookback_start(&self) -> NaiveDate {
        self.start_date - Duration::days(LOOKBACK_DAYS)
    }
}

/// A daily close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Presentation band for an estimate (±1% thresholds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionSignal {
    Bearish,
    Neutral,
    Bullish,
}

impl fmt::Display for ReactionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactionSignal::Bearish => write!(f, "SELL"),
            ReactionSignal::Neutral => write!(f, "NEUTRAL"),
            ReactionSignal::Bullish => write!(f, "BUY"),
        }
    }
}

/// Point estimate of the fractional price change (0.012 = +1.2%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub change: f64,
}

impl Estimate {
    pub fn new(change: f64) -> Self {
        Self { change }
    }

    pub fn percent(&self) -> f64 {
        self.change * 100.0
    }

    pub fn signal(&self) -> ReactionSignal {
        let pct = self.percent();
        if pct < -1.0 {
            ReactionSignal::Bearish
        } else if pct < 1.0 {
            ReactionSignal::Neutral
        } else {
            ReactionSignal::Bullish
        }
    }
}

/// Directional label of a word weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Signed importance of one headline word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub word: String,
    pub weight: f64,
}

impl Contribution {
    pub fn new(word: impl Into<String>, weight: f64) -> Self {
        Self {
            word: word.into(),
            weight,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.weight > 0.0 {
            Direction::Up
        } else if self.weight < 0.0 {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }
}

/// Local surrogate fitted around one headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Sorted by absolute weight, largest first.
    pub contributions: Vec<Contribution>,
    pub intercept: f64,
    /// Weighted R² of the surrogate on the perturbation sample.
    pub score: f64,
    /// Surrogate prediction for the unperturbed headline.
    pub local_prediction: f64,
    pub num_samples: usize,
}

impl Explanation {
    pub fn empty() -> Self {
        Self {
            contributions: Vec::new(),
            intercept: 0.0,
            score: 0.0,
            local_prediction: 0.0,
            num_samples: 0,
        }
    }

    pub fn total_importance(&self) -> f64 {
        self.contributions.iter().map(|c| c.weight.abs()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedEstimate {
    pub estimate: Estimate,
    pub explanation: Explanation,
}

/// Display bucket for a volatility percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
}

impl VolatilityLevel {
    pub fn from_percent(pct: f64) -> Self {
        if pct < 30.0 {
            VolatilityLevel::Low
        } else if pct < 70.0 {
            VolatilityLevel::Medium
        } else {
            VolatilityLevel::High
        }
    }
}

impl fmt::Display for VolatilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityLevel::Low => write!(f, "Low"),
            VolatilityLevel::Medium => write!(f, "Medium"),
            VolatilityLevel::High => write!(f, "High"),
        }
    }
}

/// Normalised dispersion over one window. `value` is 0.0 when no data was available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySample {
    pub value: f64,
    pub observations: usize,
    pub available: bool,
}

impl VolatilitySample {
    pub fn unavailable() -> Self {
        Self {
            value: 0.0,
            observations: 0,
            available: false,
        }
    }

    /// Percentage rounded to three decimals.
    pub fn percent(&self) -> f64 {
        (self.value * 100.0 * 1000.0).round() / 1000.0
    }

    pub fn level(&self) -> VolatilityLevel {
        VolatilityLevel::from_percent(self.percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
    }

    #[test]
    fn test_request_rejects_non_positive_price() {
        assert!(PredictionRequest::new("x", "BBRI", 0.0, date()).is_err());
        assert!(PredictionRequest::new("x", "BBRI", -5.0, date()).is_err());
        assert!(PredictionRequest::new("x", "BBRI", f64::NAN, date()).is_err());
    }

    #[test]
    fn test_request_normalizes_ticker() {
        let req = PredictionRequest::new("x", " bbri ", 4500.0, date()).unwrap();
        assert_eq!(req.ticker, "BBRI");
        assert!(PredictionRequest::new("x", "   ", 4500.0, date()).is_err());
    }

    #[test]
    fn test_decoded_request_is_validated() {
        let bad = r#"{"headline":"x","ticker":"BBRI","price_before":0.0,"start_date":"2024-03-11"}"#;
        let err = serde_json::from_str::<PredictionRequest>(bad).unwrap_err();
        assert!(err.to_string().contains("price_before"));

        let good = r#"{"headline":"x","ticker":" bbri ","price_before":4500.0,"start_date":"2024-03-11"}"#;
        let req: PredictionRequest = serde_json::from_str(good).unwrap();
        assert_eq!(req, PredictionRequest::new("x", "BBRI", 4500.0, date()).unwrap());
    }

    #[test]
    fn test_request_windows() {
        let req = PredictionRequest::new("x", "BBRI", 4500.0, date()).unwrap();
        assert_eq!(req.end_date(), NaiveDate::from_ymd_opt(2024, 3, 18).unwrap());
        assert_eq!(
            req.lookback_start(),
            NaiveDate::from_ymd_opt(2024, 2, 26).unwrap()
        );
    }

    #[test]
    fn test_estimate_signal_bands() {
        assert_eq!(Estimate::new(-0.02).signal(), ReactionSignal::Bearish);
        assert_eq!(Estimate::new(-0.005).signal(), ReactionSignal::Neutral);
        assert_eq!(Estimate::new(0.009).signal(), ReactionSignal::Neutral);
        assert_eq!(Estimate::new(0.01).signal(), ReactionSignal::Bullish);
    }

    #[test]
    fn test_contribution_direction() {
        assert_eq!(Contribution::new("laba", 0.3).direction(), Direction::Up);
        assert_eq!(Contribution::new("rugi", -0.1).direction(), Direction::Down);
        assert_eq!(Contribution::new("dan", 0.0).direction(), Direction::Neutral);
    }

    #[test]
    fn test_volatility_buckets() {
        assert_eq!(VolatilityLevel::from_percent(0.0), VolatilityLevel::Low);
        assert_eq!(VolatilityLevel::from_percent(29.999), VolatilityLevel::Low);
        assert_eq!(VolatilityLevel::from_percent(30.0), VolatilityLevel::Medium);
        assert_eq!(VolatilityLevel::from_percent(70.0), VolatilityLevel::High);
    }

    #[test]
    fn test_volatility_percent_rounding() {
        let sample = VolatilitySample {
            value: 0.123456,
            observations: 5,
            available: true,
        };
        assert_eq!(sample.percent(), 12.346);
    }
}
