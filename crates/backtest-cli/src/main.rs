//! backtest-cli: simulate a fixed-weight portfolio over historical closes.
//!
//! Fetches adjusted daily closes from Polygon, runs the backtest pipeline
//! for the portfolio and (unless disabled) a benchmark index, and prints the
//! metrics side by side.
//!
//! Usage:
//!   cargo run -p backtest-cli -- --tickers AAPL MSFT GOOGL
//!   cargo run -p backtest-cli -- --tickers AAPL MSFT --weights 0.7,0.3 --start 2020-01-01 --end 2025-01-01
//!   cargo run -p backtest-cli -- --tickers AAPL --no-benchmark --json

use anyhow::{bail, Context};
use backtest_core::PriceSource;
use backtest_engine::{
    backtest, compare_to_benchmark, compute_metrics, BenchmarkComparison, MetricsRecord,
};
use chrono::{NaiveDate, Utc};
use market_data::{CachedPriceSource, MarketDataClient};

const DEFAULT_START: &str = "2018-01-01";
const DEFAULT_INITIAL_AMOUNT: f64 = 10_000.0;
const DEFAULT_BENCHMARK: &str = "SPY";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backtest_cli=info,market_data=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let tickers: Vec<String> = match args.iter().position(|a| a == "--tickers") {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    if tickers.is_empty() {
        eprintln!("Usage:");
        eprintln!("  backtest-cli --tickers AAPL MSFT ...   Tickers to hold (required)");
        eprintln!("");
        eprintln!("Options:");
        eprintln!("  --weights W1,W2,...   Allocation per ticker (default: equal weight;");
        eprintln!("                        normalized by their sum, so 1,1,1 works)");
        eprintln!("  --start YYYY-MM-DD    First date (default: {})", DEFAULT_START);
        eprintln!("  --end YYYY-MM-DD      Last date (default: today)");
        eprintln!("  --initial AMOUNT      Starting capital (default: {})", DEFAULT_INITIAL_AMOUNT);
        eprintln!("  --risk-free RATE      Annual risk-free rate for Sharpe (default: 0)");
        eprintln!("  --benchmark TICKER    Benchmark index (default: {})", DEFAULT_BENCHMARK);
        eprintln!("  --no-benchmark        Skip the benchmark run");
        eprintln!("  --json                Print the report as JSON");
        std::process::exit(1);
    }

    let start = parse_date_flag(&args, "--start")?.unwrap_or_else(|| {
        DEFAULT_START.parse().expect("default start date parses")
    });
    let end = parse_date_flag(&args, "--end")?.unwrap_or_else(|| Utc::now().date_naive());
    if end <= start {
        bail!("--end {} must be after --start {}", end, start);
    }

    let weights = match flag_value(&args, "--weights") {
        Some(raw) => parse_weights(&raw)?,
        None => vec![1.0 / tickers.len() as f64; tickers.len()],
    };
    if weights.len() != tickers.len() {
        bail!(
            "{} weights given for {} tickers",
            weights.len(),
            tickers.len()
        );
    }

    let initial_amount: f64 = match flag_value(&args, "--initial") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid --initial '{}'", raw))?,
        None => DEFAULT_INITIAL_AMOUNT,
    };
    let risk_free_rate: f64 = match flag_value(&args, "--risk-free") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid --risk-free '{}'", raw))?,
        None => 0.0,
    };

    let benchmark_ticker = if args.iter().any(|a| a == "--no-benchmark") {
        None
    } else {
        Some(flag_value(&args, "--benchmark").unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()))
    };
    let as_json = args.iter().any(|a| a == "--json");

    let api_key =
        std::env::var("POLYGON_API_KEY").context("POLYGON_API_KEY must be set")?;
    let source = CachedPriceSource::new(MarketDataClient::new(api_key));

    tracing::info!(
        "Backtesting {} from {} to {} (initial {})",
        tickers.join(", "),
        start,
        end,
        initial_amount
    );

    let prices = source.fetch_prices(&tickers, start, end).await?;
    let (equity_curve, returns) = backtest(&prices, &weights, initial_amount)?;
    let metrics = compute_metrics(&equity_curve, &returns, risk_free_rate);
    tracing::info!(
        "Portfolio: {} trading days, final equity {:.2}",
        equity_curve.len(),
        equity_curve.last().map(|p| p.equity).unwrap_or(initial_amount)
    );

    let comparison = match benchmark_ticker {
        Some(ticker) => {
            let bench_prices = source
                .fetch_prices(&[ticker.clone()], start, end)
                .await?;
            let (bench_equity, bench_returns) = backtest(&bench_prices, &[1.0], initial_amount)?;
            let bench_metrics = compute_metrics(&bench_equity, &bench_returns, risk_free_rate);
            Some((
                ticker,
                compare_to_benchmark(metrics, &returns, bench_metrics, &bench_returns),
            ))
        }
        None => None,
    };

    if as_json {
        print_json(&tickers, metrics, comparison.as_ref())?;
    } else {
        print_report(&tickers, metrics, comparison.as_ref());
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_date_flag(args: &[String], flag: &str) -> anyhow::Result<Option<NaiveDate>> {
    flag_value(args, flag)
        .map(|raw| {
            raw.parse()
                .with_context(|| format!("invalid {} '{}', expected YYYY-MM-DD", flag, raw))
        })
        .transpose()
}

fn parse_weights(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid weight '{}'", part.trim()))
        })
        .collect()
}

fn print_report(
    tickers: &[String],
    metrics: MetricsRecord,
    comparison: Option<&(String, BenchmarkComparison)>,
) {
    println!("Portfolio: {}", tickers.join(", "));
    print_metrics(&metrics);

    if let Some((ticker, comparison)) = comparison {
        println!();
        println!("Benchmark: {}", ticker);
        print_metrics(&comparison.benchmark);
        println!();
        println!("  {:<18} {:>12.4}", "alpha", comparison.alpha);
        match comparison.information_ratio {
            Some(ratio) => println!("  {:<18} {:>12.4}", "information_ratio", ratio),
            None => println!("  {:<18} {:>12}", "information_ratio", "n/a"),
        }
    }
}

fn print_metrics(metrics: &MetricsRecord) {
    println!("  {:<18} {:>12.4}", "total_return", metrics.total_return);
    println!("  {:<18} {:>12.4}", "annual_return", metrics.annual_return);
    println!("  {:<18} {:>12.4}", "annual_vol", metrics.annual_vol);
    println!("  {:<18} {:>12.4}", "sharpe", metrics.sharpe);
    println!("  {:<18} {:>12.4}", "max_drawdown", metrics.max_drawdown);
}

fn print_json(
    tickers: &[String],
    metrics: MetricsRecord,
    comparison: Option<&(String, BenchmarkComparison)>,
) -> anyhow::Result<()> {
    let report = match comparison {
        Some((ticker, comparison)) => serde_json::json!({
            "tickers": tickers,
            "metrics": metrics,
            "benchmark_ticker": ticker,
            "benchmark": comparison,
        }),
        None => serde_json::json!({
            "tickers": tickers,
            "metrics": metrics,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_parse_with_whitespace() {
        assert_eq!(parse_weights("0.5,0.5").unwrap(), vec![0.5, 0.5]);
        assert_eq!(parse_weights(" 1 , 2 , 3 ").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(parse_weights("0.5,abc").is_err());
    }

    #[test]
    fn date_flags_validate_format() {
        let args: Vec<String> = ["bin", "--start", "2020-01-01"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            parse_date_flag(&args, "--start").unwrap(),
            Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );

        let bad: Vec<String> = ["bin", "--start", "01/02/2020"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(parse_date_flag(&bad, "--start").is_err());
    }
}
