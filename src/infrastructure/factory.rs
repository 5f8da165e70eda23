use crate::config::{Config, Mode};
use crate::domain::ports::MarketDataService;
use crate::infrastructure::csv_market_data::CsvMarketDataService;
use crate::infrastructure::mock::MockMarketDataService;
use crate::infrastructure::yahoo::YahooMarketDataService;
use std::sync::Arc;
use tracing::info;

pub struct ServiceFactory;

impl ServiceFactory {
    pub fn create_market_data_service(config: &Config) -> Arc<dyn MarketDataService> {
        let market = &config.market_data;
        info!("Market data provider: {}", market.mode);

        match market.mode {
            Mode::Yahoo => Arc::new(
                YahooMarketDataService::builder()
                    .base_url(market.yahoo_base_url.clone())
                    .ticker_suffix(market.ticker_suffix.clone())
                    .request_timeout(market.timeout())
                    .build(),
            ),
            Mode::Csv => Arc::new(CsvMarketDataService::new(market.data_dir.clone())),
            Mode::Mock => Arc::new(MockMarketDataService::new().with_synthetic_fallback()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_follows_mode() {
        let config = Config::from_source(&|k| (k == "MARKET_DATA_MODE").then(|| "csv".to_string()))
            .unwrap();
        assert_eq!(ServiceFactory::create_market_data_service(&config).name(), "csv");

        let config = Config::from_source(&|_| None).unwrap();
        assert_eq!(ServiceFactory::create_market_data_service(&config).name(), "yahoo");
    }

    #[tokio::test]
    async fn test_mock_mode_serves_any_ticker() {
        let config =
            Config::from_source(&|k| (k == "MARKET_DATA_MODE").then(|| "mock".to_string()))
                .unwrap();
        let market = ServiceFactory::create_market_data_service(&config);
        let end = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let start = end - chrono::Duration::days(14);

        for ticker in ["BBRI", "TLKM", "ASII"] {
            let closes = market.get_daily_closes(ticker, start, end).await.unwrap();
            assert!(!closes.is_empty(), "no closes for {}", ticker);
        }
    }
}
