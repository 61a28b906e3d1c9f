use std::collections::HashMap;

use chrono::NaiveDate;
use statrs::statistics::Statistics;

use crate::metrics::TRADING_DAYS_PER_YEAR;
use crate::models::{BenchmarkComparison, MetricsRecord, ReturnPoint};

/// Diff portfolio metrics against a reference index run through the same
/// pipeline.
///
/// Alpha is the difference in total return. The information ratio is
/// computed over the dates both return series share (the two runs may have
/// dropped different rows around data gaps).
pub fn compare_to_benchmark(
    portfolio: MetricsRecord,
    portfolio_returns: &[ReturnPoint],
    benchmark: MetricsRecord,
    benchmark_returns: &[ReturnPoint],
) -> BenchmarkComparison {
    BenchmarkComparison {
        alpha: portfolio.total_return - benchmark.total_return,
        information_ratio: information_ratio(portfolio_returns, benchmark_returns),
        portfolio,
        benchmark,
    }
}

/// Annualized mean excess daily return divided by annualized tracking error.
///
/// `None` when fewer than 3 shared dates remain or the tracking error is
/// (numerically) zero.
fn information_ratio(
    portfolio_returns: &[ReturnPoint],
    benchmark_returns: &[ReturnPoint],
) -> Option<f64> {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark_returns
        .iter()
        .map(|r| (r.date, r.value))
        .collect();

    let excess: Vec<f64> = portfolio_returns
        .iter()
        .filter_map(|r| bench_by_date.get(&r.date).map(|b| r.value - b))
        .collect();
    if excess.len() < 3 {
        return None;
    }

    let slice = excess.as_slice();
    let tracking_error = slice.std_dev() * TRADING_DAYS_PER_YEAR.sqrt();
    if !tracking_error.is_finite() || tracking_error < 1e-12 {
        return None;
    }

    Some(slice.mean() * TRADING_DAYS_PER_YEAR / tracking_error)
}
