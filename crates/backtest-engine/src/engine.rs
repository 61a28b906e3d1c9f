use backtest_core::{BacktestError, PriceTable};

use crate::models::{EquityPoint, ReturnPoint};

/// Simulate a fixed-weight portfolio over a table of daily close prices.
///
/// Weights are normalized by their sum, so `[1.0, 1.0]` and `[0.5, 0.5]`
/// describe the same portfolio. The first table row is consumed as the
/// baseline and produces no output, and any return row that touches a
/// missing close for any ticker is dropped whole. The equity curve is the
/// running product of `(1 + portfolio_return)` scaled by `initial_amount`,
/// so its first entry already reflects the first day's move.
///
/// The equity curve and the return series come back aligned index-for-index
/// over the same dates. The input table is never mutated, and identical
/// inputs always produce identical outputs.
///
/// Degenerate inputs fail fast instead of leaking NaN downstream: a zero
/// weight sum is [`BacktestError::DegenerateWeights`], and fewer than two
/// aligned valid price rows is [`BacktestError::InsufficientData`].
pub fn backtest(
    prices: &PriceTable,
    weights: &[f64],
    initial_amount: f64,
) -> Result<(Vec<EquityPoint>, Vec<ReturnPoint>), BacktestError> {
    if weights.len() != prices.num_tickers() {
        return Err(BacktestError::WeightCountMismatch {
            expected: prices.num_tickers(),
            actual: weights.len(),
        });
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum == 0.0 {
        return Err(BacktestError::DegenerateWeights);
    }
    let normalized: Vec<f64> = weights.iter().map(|w| w / weight_sum).collect();

    let returns = portfolio_returns(prices, &normalized);
    if returns.is_empty() {
        return Err(BacktestError::InsufficientData(format!(
            "{} price rows leave no aligned return rows",
            prices.num_rows()
        )));
    }

    let mut equity_curve = Vec::with_capacity(returns.len());
    let mut equity = initial_amount;
    for point in &returns {
        equity *= 1.0 + point.value;
        equity_curve.push(EquityPoint {
            date: point.date,
            equity,
        });
    }

    Ok((equity_curve, returns))
}

/// Weighted daily simple returns from consecutive close rows.
///
/// Each return row is built from the raw table rows `t-1` and `t`; a missing
/// close in either row drops row `t` entirely (row-wise, not per column).
fn portfolio_returns(prices: &PriceTable, normalized: &[f64]) -> Vec<ReturnPoint> {
    let mut out = Vec::new();
    for t in 1..prices.num_rows() {
        let prev = prices.row(t - 1);
        let cur = prices.row(t);

        let mut value = 0.0;
        let mut complete = true;
        for (j, weight) in normalized.iter().enumerate() {
            match (prev[j], cur[j]) {
                (Some(p0), Some(p1)) => value += weight * ((p1 - p0) / p0),
                _ => {
                    complete = false;
                    break;
                }
            }
        }

        if complete {
            out.push(ReturnPoint {
                date: prices.dates()[t],
                value,
            });
        }
    }
    out
}
