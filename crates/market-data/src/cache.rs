use std::time::{Duration, Instant};

use async_trait::async_trait;
use backtest_core::{BacktestError, PriceSource, PriceTable};
use chrono::NaiveDate;
use dashmap::DashMap;

const CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Cached table plus the instant it was stored.
struct CacheEntry {
    table: PriceTable,
    cached_at: Instant,
}

/// Memoizing wrapper around a [`PriceSource`], keyed by ticker set and date
/// range with a fixed TTL.
///
/// Caching lives here, at the collaborator boundary; the engines downstream
/// stay stateless and cache-free.
pub struct CachedPriceSource<S> {
    inner: S,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl<S> CachedPriceSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, Duration::from_secs(CACHE_TTL_SECS))
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
        }
    }

    fn cache_key(tickers: &[String], start: NaiveDate, end: NaiveDate) -> String {
        format!("{}|{}|{}", tickers.join(","), start, end)
    }
}

#[async_trait]
impl<S: PriceSource> PriceSource for CachedPriceSource<S> {
    async fn fetch_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, BacktestError> {
        let key = Self::cache_key(tickers, start, end);

        if let Some(entry) = self.entries.get(&key) {
            if entry.cached_at.elapsed() < self.ttl {
                tracing::debug!("Price cache hit for {}", key);
                return Ok(entry.table.clone());
            }
        }

        let table = self.inner.fetch_prices(tickers, start, end).await?;
        self.entries.insert(
            key,
            CacheEntry {
                table: table.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use backtest_core::DailyClose;

    use super::*;

    /// Counts how often the underlying source is actually hit.
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_prices(
            &self,
            tickers: &[String],
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceTable, BacktestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let columns = tickers
                .iter()
                .map(|_| {
                    vec![
                        DailyClose {
                            date: start,
                            close: 100.0,
                        },
                        DailyClose {
                            date: start.succ_opt().unwrap(),
                            close: 101.0,
                        },
                    ]
                })
                .collect();
            PriceTable::from_columns(tickers.to_vec(), columns)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn repeat_fetch_within_ttl_hits_the_cache() {
        let source = CachedPriceSource::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];

        let first = source.fetch_prices(&tickers, d(2), d(31)).await.unwrap();
        let second = source.fetch_prices(&tickers, d(2), d(31)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_range_or_tickers_miss_the_cache() {
        let source = CachedPriceSource::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let tickers = vec!["AAPL".to_string()];

        source.fetch_prices(&tickers, d(2), d(31)).await.unwrap();
        source.fetch_prices(&tickers, d(3), d(31)).await.unwrap();
        let more = vec!["AAPL".to_string(), "MSFT".to_string()];
        source.fetch_prices(&more, d(2), d(31)).await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let source = CachedPriceSource::with_ttl(
            CountingSource {
                calls: AtomicUsize::new(0),
            },
            Duration::from_millis(0),
        );
        let tickers = vec!["AAPL".to_string()];

        source.fetch_prices(&tickers, d(2), d(31)).await.unwrap();
        source.fetch_prices(&tickers, d(2), d(31)).await.unwrap();

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
    }
}
