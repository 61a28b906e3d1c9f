use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{BacktestError, PriceTable};

/// Source of historical daily close prices.
///
/// Implementations return one column per requested ticker, close prices
/// only, dates ascending, with rows that carry no data for any ticker
/// already dropped.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, BacktestError>;
}
