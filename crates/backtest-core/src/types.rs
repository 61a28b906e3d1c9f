use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::BacktestError;

/// One adjusted daily close for a single ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily close prices for a set of tickers, aligned on trading dates.
///
/// Rows are trading dates in strictly ascending order, columns are tickers in
/// a fixed order. A `None` cell is a date where that ticker has no close;
/// gaps occur only at the edges of a ticker's history, never mid-series, and
/// are never filled. Rows where every ticker is missing are discarded at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTable {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    /// `rows[i][j]` = close of `tickers[j]` on `dates[i]`.
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from pre-aligned rows, validating the date index.
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, BacktestError> {
        if tickers.is_empty() {
            return Err(BacktestError::InvalidData(
                "price table needs at least one ticker".to_string(),
            ));
        }
        if dates.len() != rows.len() {
            return Err(BacktestError::InvalidData(format!(
                "{} dates but {} price rows",
                dates.len(),
                rows.len()
            )));
        }
        for window in dates.windows(2) {
            if window[1] <= window[0] {
                return Err(BacktestError::InvalidData(format!(
                    "dates must be strictly increasing, got {} after {}",
                    window[1], window[0]
                )));
            }
        }
        for (date, row) in dates.iter().zip(&rows) {
            if row.len() != tickers.len() {
                return Err(BacktestError::InvalidData(format!(
                    "row {} has {} cells for {} tickers",
                    date,
                    row.len(),
                    tickers.len()
                )));
            }
        }

        // Drop rows with no data for any ticker.
        let (dates, rows): (Vec<_>, Vec<_>) = dates
            .into_iter()
            .zip(rows)
            .filter(|(_, row)| row.iter().any(|cell| cell.is_some()))
            .unzip();

        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    /// Align per-ticker close series into a table over the union of their
    /// dates. A ticker missing a date gets `None` in that row.
    pub fn from_columns(
        tickers: Vec<String>,
        columns: Vec<Vec<DailyClose>>,
    ) -> Result<Self, BacktestError> {
        if tickers.len() != columns.len() {
            return Err(BacktestError::InvalidData(format!(
                "{} tickers but {} price columns",
                tickers.len(),
                columns.len()
            )));
        }
        for (ticker, column) in tickers.iter().zip(&columns) {
            if column.is_empty() {
                return Err(BacktestError::MissingTickerData(ticker.clone()));
            }
        }

        let mut all_dates: Vec<NaiveDate> = columns
            .iter()
            .flat_map(|column| column.iter().map(|c| c.date))
            .collect();
        all_dates.sort_unstable();
        all_dates.dedup();

        let mut by_date: Vec<HashMap<NaiveDate, f64>> = Vec::with_capacity(columns.len());
        for (ticker, column) in tickers.iter().zip(&columns) {
            let mut map = HashMap::with_capacity(column.len());
            for close in column {
                if map.insert(close.date, close.close).is_some() {
                    return Err(BacktestError::InvalidData(format!(
                        "duplicate close for {} on {}",
                        ticker, close.date
                    )));
                }
            }
            by_date.push(map);
        }

        let rows = all_dates
            .iter()
            .map(|date| by_date.iter().map(|map| map.get(date).copied()).collect())
            .collect();

        Self::new(tickers, all_dates, rows)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn num_tickers(&self) -> usize {
        self.tickers.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Closes for all tickers on the `i`-th date.
    pub fn row(&self, i: usize) -> &[Option<f64>] {
        &self.rows[i]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
