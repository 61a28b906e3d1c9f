use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backtest_core::{BacktestError, DailyClose, PriceSource, PriceTable};
use chrono::{DateTime, NaiveDate};
use futures_util::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod cache;

pub use cache::CachedPriceSource;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window`.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while ts
                .front()
                .is_some_and(|&front| now.duration_since(front) >= self.window)
            {
                ts.pop_front();
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let oldest = *ts.front().expect("window is full");
            drop(ts);
            let wait = self.window.saturating_sub(now.duration_since(oldest))
                + Duration::from_millis(50);
            tracing::debug!("Rate limiter: waiting {:.1}s for an API slot", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

/// Async client for adjusted daily close prices from the Polygon aggregates
/// API. Fetches per ticker and aligns the results into a [`PriceTable`].
#[derive(Clone)]
pub struct MarketDataClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl MarketDataClient {
    /// Default 500 req/min for the Starter plan; free tier users should set
    /// POLYGON_RATE_LIMIT=5.
    pub fn new(api_key: String) -> Self {
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BacktestError> {
        let request = builder
            .build()
            .map_err(|e| BacktestError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| BacktestError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| BacktestError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Polygon 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(BacktestError::ApiError(
            "Rate limited by Polygon after 3 retries".to_string(),
        ))
    }

    /// Adjusted daily closes for one ticker, ascending by date.
    ///
    /// An unknown or delisted ticker comes back as an empty series; the
    /// caller decides whether that is an error.
    pub async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyClose>, BacktestError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            BASE_URL, ticker, start, end
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(BacktestError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| BacktestError::ApiError(e.to_string()))?;

        let mut closes = Vec::with_capacity(agg_response.results.len());
        for bar in agg_response.results {
            let date = DateTime::from_timestamp_millis(bar.t)
                .ok_or_else(|| {
                    BacktestError::ApiError(format!("bad bar timestamp {} for {}", bar.t, ticker))
                })?
                .date_naive();
            closes.push(DailyClose {
                date,
                close: bar.c,
            });
        }

        tracing::debug!("Fetched {} daily closes for {}", closes.len(), ticker);
        Ok(closes)
    }
}

#[async_trait]
impl PriceSource for MarketDataClient {
    async fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, BacktestError> {
        let columns = try_join_all(
            tickers
                .iter()
                .map(|ticker| self.daily_closes(ticker, start, end)),
        )
        .await?;

        PriceTable::from_columns(tickers.to_vec(), columns)
    }
}

// --- Polygon response shapes ---

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateBar>,
}

/// One aggregate bar; only the fields the price table needs.
#[derive(Debug, Deserialize)]
struct AggregateBar {
    /// Start of the window, Unix millis.
    t: i64,
    /// Close price.
    c: f64,
}
