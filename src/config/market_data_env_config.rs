//! Market data provider configuration parsing from environment variables.

use super::{Mode, VarSource, parse_var, var_or};
use crate::infrastructure::yahoo::market_data::{DEFAULT_BASE_URL, DEFAULT_TICKER_SUFFIX};
use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MarketDataEnvConfig {
    pub mode: Mode,
    pub yahoo_base_url: String,
    pub ticker_suffix: String,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
}

impl MarketDataEnvConfig {
    pub fn from_source(source: VarSource<'_>) -> Result<Self> {
        let mode = Mode::from_str(&var_or(source, "MARKET_DATA_MODE", "yahoo"))?;
        let timeout_secs = parse_var(source, "MARKET_DATA_TIMEOUT_SECS", 10u64)?;
        if timeout_secs == 0 {
            anyhow::bail!("MARKET_DATA_TIMEOUT_SECS must be positive");
        }

        Ok(Self {
            mode,
            yahoo_base_url: var_or(source, "YAHOO_BASE_URL", DEFAULT_BASE_URL),
            // An explicitly empty suffix disables suffixing.
            ticker_suffix: source("TICKER_SUFFIX")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| DEFAULT_TICKER_SUFFIX.to_string()),
            data_dir: PathBuf::from(var_or(source, "MARKET_DATA_DIR", "data/prices")),
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_suffix_is_kept() {
        let config =
            MarketDataEnvConfig::from_source(&|k| (k == "TICKER_SUFFIX").then(String::new)).unwrap();
        assert_eq!(config.ticker_suffix, "");
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = MarketDataEnvConfig::from_source(&|k| {
            (k == "MARKET_DATA_TIMEOUT_SECS").then(|| "0".to_string())
        });
        assert!(result.is_err());
    }
}
