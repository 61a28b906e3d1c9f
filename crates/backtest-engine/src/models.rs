use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A point on the simulated equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// One daily portfolio return, as a simple (not log) return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Summary statistics for one backtest run.
///
/// Every field is always populated; quantities that are undefined for the
/// input (Sharpe on a flat return series, anything on an empty one) carry
/// NaN rather than being dropped from the record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_vol: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

/// Portfolio metrics diffed against a reference index run through the same
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub portfolio: MetricsRecord,
    pub benchmark: MetricsRecord,
    /// Portfolio total return minus benchmark total return.
    pub alpha: f64,
    /// Annualized mean excess return over tracking error, on the dates both
    /// series share. `None` when the overlap is too short or the tracking
    /// error vanishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_ratio: Option<f64>,
}
