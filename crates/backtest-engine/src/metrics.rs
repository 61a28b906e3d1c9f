use statrs::statistics::Statistics;

use crate::models::{EquityPoint, MetricsRecord, ReturnPoint};

/// Fixed annualization constant. Deliberately never derived from the actual
/// span of the date index.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summarize an equity curve and its daily return series.
///
/// Pure and infallible for any well-formed input: undefined quantities come
/// back as NaN instead of an error. A flat return series has zero annualized
/// volatility and therefore a NaN Sharpe ratio; empty inputs produce an
/// all-NaN record.
///
/// Annualization multiplies the daily mean by 252 and the daily sample
/// standard deviation by `sqrt(252)`; volatility uses Bessel's correction.
pub fn compute_metrics(
    equity_curve: &[EquityPoint],
    returns: &[ReturnPoint],
    risk_free_rate: f64,
) -> MetricsRecord {
    let total_return = match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => last.equity / first.equity - 1.0,
        _ => f64::NAN,
    };

    let (daily_mean, daily_vol) = daily_stats(returns);
    let annual_return = daily_mean * TRADING_DAYS_PER_YEAR;
    let annual_vol = daily_vol * TRADING_DAYS_PER_YEAR.sqrt();

    // NaN volatility also lands in this branch and propagates to a NaN
    // Sharpe; only an exactly-zero volatility takes the sentinel path.
    let sharpe = if annual_vol != 0.0 {
        (annual_return - risk_free_rate) / annual_vol
    } else {
        f64::NAN
    };

    MetricsRecord {
        total_return,
        annual_return,
        annual_vol,
        sharpe,
        max_drawdown: max_drawdown(equity_curve),
    }
}

/// Mean and sample standard deviation of the daily returns.
fn daily_stats(returns: &[ReturnPoint]) -> (f64, f64) {
    let values: Vec<f64> = returns.iter().map(|r| r.value).collect();
    let slice = values.as_slice();
    (slice.mean(), slice.std_dev())
}

/// Worst peak-to-trough decline: `min(equity[t] / running_max[t] - 1)`.
///
/// Always <= 0 for a non-empty curve and exactly 0 when the curve never
/// declines; NaN for an empty curve.
fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut running_max = f64::NEG_INFINITY;
    let mut worst = f64::NAN;
    for point in equity_curve {
        running_max = running_max.max(point.equity);
        let drawdown = point.equity / running_max - 1.0;
        if worst.is_nan() || drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}
