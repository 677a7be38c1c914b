//! Chunked historical backfill with termination guards.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{Candle, Period, Resolution};
use crate::provider::MarketDataProvider;

/// Window size for unbounded (MAX) backfill requests.
const MAX_CHUNK_DAYS: i64 = 5 * 365;

/// Defensive upper bound on MAX iterations, independent of data shape.
/// 16 five-year windows is 80 years of history.
const MAX_CHUNKS: usize = 16;

/// Fetches a bounded or unbounded range of historical price points,
/// chunking requests to respect provider page limits.
pub struct BackfillEngine {
    provider: Arc<dyn MarketDataProvider>,
}

impl BackfillEngine {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Retrieve the price series for `symbol` covering `period`.
    ///
    /// Bounded periods issue a single provider request. `MAX` walks
    /// backwards in five-year windows until the provider runs out of data,
    /// stops making progress, or the iteration cap is hit. Points are
    /// deduplicated by timestamp (last write wins across overlapping chunk
    /// boundaries), sorted ascending, and window-filtered relative to the
    /// latest retained timestamp.
    pub async fn backfill(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let now = Utc::now();
        let resolution = period.resolution();

        let collected = match period.lookback_days() {
            Some(days) => {
                let start = now - Duration::days(days);
                self.provider
                    .get_candles(symbol, resolution, start, now)
                    .await?
            }
            None => self.collect_unbounded(symbol, resolution, now).await?,
        };

        let deduped = dedupe_and_sort(collected);
        let filtered = apply_period_window(deduped, period);

        if filtered.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }

        debug!(
            "Backfill {} {}: {} points from {}",
            symbol,
            period.as_str(),
            filtered.len(),
            self.provider.id()
        );

        Ok(filtered)
    }

    /// Walk backwards from `now` in fixed-size windows.
    async fn collect_unbounded(
        &self,
        symbol: &str,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let mut collected: Vec<Candle> = Vec::new();
        let mut window_end = now;
        let mut earliest_seen: Option<DateTime<Utc>> = None;

        for _ in 0..MAX_CHUNKS {
            let window_start = window_end - Duration::days(MAX_CHUNK_DAYS);
            let chunk = match self
                .provider
                .get_candles(symbol, resolution, window_start, window_end)
                .await
            {
                Ok(chunk) => chunk,
                Err(MarketDataError::NoDataForRange) => break,
                Err(e) if !collected.is_empty() => {
                    // Partial history is still useful; stop the scan and
                    // keep what we have.
                    warn!(
                        "Backfill for {} stopped mid-scan after {} points: {}",
                        symbol,
                        collected.len(),
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            };

            let chunk_earliest = match chunk.first() {
                Some(first) => first.timestamp,
                None => break,
            };

            // Non-progress guard: a provider returning stale or repeated
            // windows must not loop forever.
            if let Some(previous) = earliest_seen {
                if chunk_earliest >= previous {
                    debug!(
                        "Backfill for {} made no progress (earliest {} >= {}), stopping",
                        symbol, chunk_earliest, previous
                    );
                    break;
                }
            }
            earliest_seen = Some(chunk_earliest);

            collected.extend(chunk);
            window_end = chunk_earliest;
        }

        Ok(collected)
    }
}

/// Deduplicate by timestamp, last write wins, and return ascending order.
fn dedupe_and_sort(candles: Vec<Candle>) -> Vec<Candle> {
    let mut by_timestamp: BTreeMap<DateTime<Utc>, Candle> = BTreeMap::new();
    for candle in candles {
        by_timestamp.insert(candle.timestamp, candle);
    }
    by_timestamp.into_values().collect()
}

/// Trim to the period window measured from the latest retained point, not
/// the wall clock; provider data can lag by days.
fn apply_period_window(candles: Vec<Candle>, period: Period) -> Vec<Candle> {
    let days = match period.lookback_days() {
        Some(days) => days,
        None => return candles,
    };
    let latest = match candles.last() {
        Some(last) => last.timestamp,
        None => return candles,
    };
    let cutoff = latest - Duration::days(days);
    candles
        .into_iter()
        .filter(|c| c.timestamp >= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::Quote;

    fn candle_at(ts: DateTime<Utc>, close: rust_decimal::Decimal) -> Candle {
        Candle {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
        }
    }

    /// Provider that always returns the same non-empty chunk, regardless of
    /// the requested window.
    struct RepeatingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for RepeatingProvider {
        fn id(&self) -> &'static str {
            "REPEATING"
        }

        async fn get_quote(&self, _symbol: &str) -> Result<Quote, MarketDataError> {
            unimplemented!("not used by backfill tests")
        }

        async fn get_candles(
            &self,
            _symbol: &str,
            _resolution: Resolution,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ts = Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap();
            Ok(vec![
                candle_at(ts, dec!(10)),
                candle_at(ts + Duration::days(1), dec!(11)),
            ])
        }
    }

    /// Provider that serves a fixed series. With `windowed` set it honors
    /// the requested range; without it it returns the whole series, like a
    /// provider that pages by count and ignores date bounds.
    struct SeriesProvider {
        series: Vec<Candle>,
        windowed: bool,
    }

    #[async_trait]
    impl MarketDataProvider for SeriesProvider {
        fn id(&self) -> &'static str {
            "SERIES"
        }

        async fn get_quote(&self, _symbol: &str) -> Result<Quote, MarketDataError> {
            unimplemented!("not used by backfill tests")
        }

        async fn get_candles(
            &self,
            _symbol: &str,
            _resolution: Resolution,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, MarketDataError> {
            let window: Vec<Candle> = self
                .series
                .iter()
                .filter(|c| !self.windowed || (c.timestamp >= start && c.timestamp <= end))
                .cloned()
                .collect();
            if window.is_empty() {
                return Err(MarketDataError::NoDataForRange);
            }
            Ok(window)
        }
    }

    #[tokio::test]
    async fn max_backfill_terminates_against_repeating_chunks() {
        let provider = Arc::new(RepeatingProvider {
            calls: AtomicUsize::new(0),
        });
        let engine = BackfillEngine::new(provider.clone());

        let candles = engine.backfill("AAPL", Period::Max).await.unwrap();

        // First chunk collected, second chunk detected as non-progress.
        assert_eq!(candles.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn max_backfill_walks_history_and_dedupes_boundaries() {
        // Twelve years of yearly points; a 5-year window sees at most 5-6.
        let mut series = Vec::new();
        for year in 2012..=2023 {
            let ts = Utc.with_ymd_and_hms(year, 1, 15, 0, 0, 0).unwrap();
            series.push(candle_at(ts, dec!(100)));
        }
        let engine = BackfillEngine::new(Arc::new(SeriesProvider {
            series,
            windowed: true,
        }));

        let candles = engine.backfill("VT", Period::Max).await.unwrap();

        assert_eq!(candles.len(), 12);
        // Strictly ascending with no duplicate timestamps.
        for pair in candles.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn bounded_period_windows_relative_to_latest_point() {
        // Provider data ends 10 days ago; anchoring the window on "now"
        // would keep only 21 of the trailing 31 days. Anchored on the
        // latest retained point, a full month survives.
        let now = Utc::now();
        let mut series = Vec::new();
        for day in 0..40 {
            series.push(candle_at(now - Duration::days(10 + day), dec!(50)));
        }
        let engine = BackfillEngine::new(Arc::new(SeriesProvider {
            series,
            windowed: false,
        }));

        let candles = engine.backfill("DELAYED", Period::OneMonth).await.unwrap();

        let latest = candles.last().unwrap().timestamp;
        let earliest = candles.first().unwrap().timestamp;
        assert!(latest - earliest <= Duration::days(30));
        assert_eq!(candles.len(), 31);
    }

    #[tokio::test]
    async fn empty_result_is_no_data() {
        let engine = BackfillEngine::new(Arc::new(SeriesProvider {
            series: vec![],
            windowed: true,
        }));
        let err = engine.backfill("NOPE", Period::OneYear).await.unwrap_err();
        assert!(matches!(err, MarketDataError::NoDataForRange));
    }
}
