// =============================================================================
// Market Data Provider
// =============================================================================
//
// The scanner only needs one thing from upstream: an ordered OHLCV history for
// a symbol.  Any failure (network, auth, quota, unknown symbol, empty or
// malformed payload) comes back as an error and is treated uniformly as "no
// series for this symbol".

pub mod alpha_vantage;
pub mod rate_limit;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PriceSeries;

pub use alpha_vantage::AlphaVantageClient;
pub use rate_limit::{CallBudget, Throttle, ThrottleSnapshot};

/// Source of intraday price history.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch the time-ordered price series for `symbol`.
    async fn fetch_series(&self, symbol: &str) -> Result<PriceSeries>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
