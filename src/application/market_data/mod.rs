// Market data derived outputs
pub mod price_history;
pub mod volatility;

pub use price_history::{PriceVolatilityService, fetch_closes};
