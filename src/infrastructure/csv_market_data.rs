use crate::domain::errors::MarketDataError;
use crate::domain::ports::MarketDataService;
use crate::domain::types::PricePoint;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

const PROVIDER: &str = "csv";

/// Daily closes read from `{dir}/{TICKER}.csv`.
///
/// Only the `Date` and `Close` columns are used, so yfinance exports load as
/// they are. Dates may carry a time suffix (`2024-03-04 00:00:00+07:00`).
pub struct CsvMarketDataService {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Date", alias = "date", alias = "Datetime")]
    date: String,
    #[serde(rename = "Close", alias = "close")]
    close: Option<f64>,
}

impl CsvMarketDataService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.trim().to_uppercase()))
    }
}

/// Parse a price CSV into ascending closes. Rows with an unreadable date or
/// an empty close are skipped.
pub fn parse_price_csv(symbol: &str, text: &str) -> Result<Vec<PricePoint>, MarketDataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(MarketDataError::InvalidData {
                    symbol: symbol.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let date = record
            .date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        match (date, record.close.filter(|c| c.is_finite())) {
            (Some(date), Some(close)) => points.push(PricePoint { date, close }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("CsvMarketDataService: skipped {} rows for {}", skipped, symbol);
    }
    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[async_trait]
impl MarketDataService for CsvMarketDataService {
    async fn get_daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let path = self.path_for(ticker);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("CsvMarketDataService: no file for {} at {:?}", ticker, path);
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!("CsvMarketDataService: cannot read {:?}: {}", path, e);
                return Err(MarketDataError::Request {
                    provider: PROVIDER.to_string(),
                    reason: format!("{}: {}", path.display(), e),
                });
            }
        };

        let points = parse_price_csv(ticker, &text)?;
        Ok(points
            .into_iter()
            .filter(|p| p.date >= start && p.date < end)
            .collect())
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const YFINANCE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-03-05 00:00:00+07:00,5950,6000,5900,5975,5975,1000
2024-03-04 00:00:00+07:00,5900,5950,5850,5900,5900,1200
2024-03-06 00:00:00+07:00,5975,6050,5950,,6025,900
";

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_parse_yfinance_export() {
        let points = parse_price_csv("BBRI", YFINANCE).unwrap();
        assert_eq!(
            points,
            vec![
                PricePoint { date: d(4), close: 5900.0 },
                PricePoint { date: d(5), close: 5975.0 },
            ]
        );
    }

    #[test]
    fn test_parse_minimal_layout() {
        let text = "date,close\n2024-03-04,100.5\nnot-a-date,1\n";
        let points = parse_price_csv("X", text).unwrap();
        assert_eq!(points, vec![PricePoint { date: d(4), close: 100.5 }]);
    }

    #[tokio::test]
    async fn test_reads_ticker_file_and_filters_window() {
        let dir = std::env::temp_dir().join(format!("newsreact-csv-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("BBRI.csv"), YFINANCE).unwrap();

        let svc = CsvMarketDataService::new(&dir);
        let closes = svc.get_daily_closes("bbri", d(5), d(7)).await.unwrap();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].date, d(5));

        assert!(svc.get_daily_closes("TLKM", d(1), d(9)).await.unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
