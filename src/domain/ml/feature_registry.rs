use crate::domain::types::PricePoint;
use statrs::statistics::{Data, Distribution};

/// Ordered list of numeric feature names.
/// This order MUST match the column order the scaler and regressor were fit on.
/// Any change here is a breaking change for the model artifacts.
pub const NUMERIC_FEATURE_NAMES: &[&str] = &[
    "price_before",
    "last_close_gap",
    "pre_event_return",
    "pre_event_volatility",
];

/// Width of the numeric block of the feature vector.
pub const NUM_FEAT_DIM: usize = NUMERIC_FEATURE_NAMES.len();

/// Raw (unscaled) market context for one request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericContext {
    pub price_before: f64,
    pub last_close_gap: f64,
    pub pre_event_return: f64,
    pub pre_event_volatility: f64,
}

impl NumericContext {
    /// Derive the context from the pre-event closes. Returns `None` when the
    /// lookback window holds no usable close.
    pub fn from_history(price_before: f64, history: &[PricePoint]) -> Option<Self> {
        let closes: Vec<f64> = history
            .iter()
            .map(|p| p.close)
            .filter(|c| c.is_finite() && *c > 0.0)
            .collect();

        let first = *closes.first()?;
        let last = *closes.last()?;

        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let pre_event_volatility = sample_std_dev(&returns).unwrap_or(0.0);

        Some(Self {
            price_before,
            last_close_gap: price_before / last - 1.0,
            pre_event_return: last / first - 1.0,
            pre_event_volatility,
        })
    }

    /// Raw values in `NUMERIC_FEATURE_NAMES` order.
    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.price_before,
            self.last_close_gap,
            self.pre_event_return,
            self.pre_event_volatility,
        ]
    }
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec()).std_dev()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close,
        }
    }

    #[test]
    fn test_feature_vector_length() {
        let ctx = NumericContext::default();
        assert_eq!(ctx.to_vector().len(), NUMERIC_FEATURE_NAMES.len());
    }

    #[test]
    fn test_context_from_history() {
        let history = vec![point(1, 100.0), point(4, 110.0), point(5, 121.0)];
        let ctx = NumericContext::from_history(121.0, &history).unwrap();

        assert_eq!(ctx.price_before, 121.0);
        assert!(ctx.last_close_gap.abs() < 1e-12);
        assert!((ctx.pre_event_return - 0.21).abs() < 1e-12);
        // Both daily returns are +10%
        assert!(ctx.pre_event_volatility.abs() < 1e-12);
    }

    #[test]
    fn test_context_single_close() {
        let ctx = NumericContext::from_history(100.0, &[point(1, 80.0)]).unwrap();
        assert!((ctx.last_close_gap - 0.25).abs() < 1e-12);
        assert_eq!(ctx.pre_event_return, 0.0);
        assert_eq!(ctx.pre_event_volatility, 0.0);
    }

    #[test]
    fn test_context_requires_history() {
        assert!(NumericContext::from_history(100.0, &[]).is_none());
        assert!(NumericContext::from_history(100.0, &[point(1, 0.0)]).is_none());
    }
}
