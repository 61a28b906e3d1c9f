use thiserror::Error;

/// Errors surfaced by the backtest pipeline and the market-data layer.
///
/// Degenerate inputs (zero weight sum, too few aligned price rows) fail fast
/// with a typed error instead of letting NaN propagate into the downstream
/// metrics, which the legacy permissive behavior allowed.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Degenerate weights: weight sum is zero")]
    DegenerateWeights,

    #[error("Weight count mismatch: {expected} ticker columns, {actual} weights")]
    WeightCountMismatch { expected: usize, actual: usize },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("No price data for ticker: {0}")]
    MissingTickerData(String),

    #[error("API error: {0}")]
    ApiError(String),
}
