use crate::domain::errors::MarketDataError;
use crate::domain::types::PricePoint;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of historical daily closes.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Daily closes for `ticker` in the half-open window `[start, end)`,
    /// ascending by date. An unknown ticker or an empty window yields an
    /// empty vector, not an error.
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketDataError>;

    /// Provider name used in logs and metrics labels.
    fn name(&self) -> &str;
}
