use statrs::statistics::{Data, Distribution};

/// Trading days used to annualise daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Closes that can enter a return: finite and strictly positive.
pub fn usable_closes(closes: &[f64]) -> Vec<f64> {
    closes
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect()
}

/// Calculate realized volatility from daily closes
///
/// Sample standard deviation of simple returns, annualised by
/// `sqrt(periods_per_year)`. Non-positive or non-finite closes are dropped
/// before returns are taken. Returns `None` with fewer than two usable closes.
pub fn calculate_realized_volatility(closes: &[f64], periods_per_year: f64) -> Option<f64> {
    let returns: Vec<f64> = usable_closes(closes)
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();

    match returns.len() {
        0 => None,
        // One return has no spread; pandas reports NaN, treat as flat.
        1 => Some(0.0),
        _ => {
            let std_dev = Data::new(returns).std_dev()?;
            Some(std_dev * periods_per_year.sqrt())
        }
    }
}

/// Annualised daily volatility clamped to `[0, 1]`.
pub fn bounded_volatility(closes: &[f64]) -> Option<f64> {
    calculate_realized_volatility(closes, TRADING_DAYS_PER_YEAR)
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realized_volatility_calculation() {
        let prices = vec![100.0, 102.0, 101.0, 103.0, 102.5, 104.0, 103.0, 105.0];
        let vol = calculate_realized_volatility(&prices, 252.0).unwrap();
        assert!(vol > 0.0 && vol < 1.0);
    }

    #[test]
    fn test_flat_closes_have_zero_volatility() {
        let prices = vec![5000.0; 7];
        assert_eq!(bounded_volatility(&prices), Some(0.0));
    }

    #[test]
    fn test_matches_sample_std_of_simple_returns() {
        // returns: +10%, -10%; mean 0, sample std = sqrt(0.02) ≈ 0.1414
        let prices = vec![100.0, 110.0, 99.0];
        let vol = calculate_realized_volatility(&prices, 1.0).unwrap();
        assert!((vol - 0.02f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_is_clamped() {
        let prices = vec![100.0, 200.0, 50.0, 300.0];
        assert_eq!(bounded_volatility(&prices), Some(1.0));
    }

    #[test]
    fn test_realized_volatility_insufficient_data() {
        assert!(calculate_realized_volatility(&[100.0], 252.0).is_none());
        assert!(bounded_volatility(&[]).is_none());
    }

    #[test]
    fn test_zero_close_is_skipped_not_a_total_loss() {
        // Without the zero: +10%, -10%.
        let prices = vec![100.0, 110.0, 0.0, 99.0];
        let vol = calculate_realized_volatility(&prices, 1.0).unwrap();
        assert!((vol - 0.02f64.sqrt()).abs() < 1e-12);

        let with_nan = vec![100.0, f64::NAN, 110.0, -5.0, 99.0];
        let vol = calculate_realized_volatility(&with_nan, 1.0).unwrap();
        assert!((vol - 0.02f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_usable_closes() {
        assert_eq!(
            usable_closes(&[100.0, 0.0, f64::INFINITY, -1.0, 101.0]),
            vec![100.0, 101.0]
        );
    }

    #[test]
    fn test_realized_volatility_zero_prices() {
        let prices = vec![0.0, 0.0, 0.0];
        assert!(calculate_realized_volatility(&prices, 252.0).is_none());
    }
}
