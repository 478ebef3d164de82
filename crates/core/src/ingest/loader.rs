use crate::domain::price::{PriceObservation, PriceSeries};
use crate::error::RecommendError;
use crate::ingest::cache::{PriceCache, SeriesKey};
use crate::ingest::provider::{PriceSource, SourceError};
use crate::ingest::types::RawPriceBar;
use crate::time::calendar::{largest_weekday_gap, resolve_fetch_window};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_GAP_DAYS: u32 = 5;

/// Fetches, cleans, and caches price series for the engine.
pub struct SeriesLoader {
    source: Arc<dyn PriceSource>,
    cache: Option<Arc<PriceCache>>,
    fetch_timeout: Duration,
    max_gap_days: u32,
}

impl SeriesLoader {
    pub fn new(source: Arc<dyn PriceSource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            cache: None,
            fetch_timeout,
            max_gap_days: DEFAULT_MAX_GAP_DAYS,
        }
    }

    pub fn with_cache(mut self, cache: Arc<PriceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_max_gap_days(mut self, max_gap_days: u32) -> Self {
        self.max_gap_days = max_gap_days;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.source.provider_name()
    }

    /// Load a series with at least two observations for an already-normalized ticker.
    pub async fn load(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        now_utc: DateTime<Utc>,
    ) -> Result<Arc<PriceSeries>, RecommendError> {
        if ticker.is_empty() {
            return Err(RecommendError::invalid("ticker must be non-empty"));
        }
        if start >= end {
            return Err(RecommendError::invalid(format!(
                "start_date ({start}) must be before end_date ({end})"
            )));
        }

        let Some(window) = resolve_fetch_window(start, end, now_utc) else {
            return Err(RecommendError::no_data(format!(
                "no market data available for {ticker}: the range starts in the future ({start})"
            )));
        };

        let key = SeriesKey {
            ticker: ticker.to_string(),
            start: window.start,
            end: window.end,
        };
        if let Some(series) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            tracing::debug!(%ticker, %start, %end, "price series cache hit");
            return Ok(series);
        }

        let fetch = self.source.fetch_daily_bars(ticker, window.start, window.end);
        let bars = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Err(_) => {
                tracing::warn!(%ticker, timeout = ?self.fetch_timeout, "price fetch timed out");
                return Err(RecommendError::UpstreamTimeout(self.fetch_timeout));
            }
            Ok(Err(SourceError::NotFound(_))) => {
                return Err(no_data_for(ticker, window.start, window.end));
            }
            Ok(Err(SourceError::Other(err))) => {
                return Err(RecommendError::UpstreamUnavailable(
                    err.context(format!("fetching {ticker} from {}", self.provider_name())),
                ));
            }
            Ok(Ok(bars)) => bars,
        };

        let observations = normalize_bars(ticker, bars, window.start, window.end);
        if observations.len() < 2 {
            return Err(no_data_for(ticker, window.start, window.end));
        }

        let dates: Vec<NaiveDate> = observations.iter().map(|o| o.date).collect();
        let gap = largest_weekday_gap(&dates);
        if gap > self.max_gap_days {
            tracing::warn!(%ticker, gap_weekdays = gap, max = self.max_gap_days, "price series has a large gap");
        }

        let series = Arc::new(PriceSeries::new(ticker, observations)?);
        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::clone(&series));
        }

        tracing::info!(
            %ticker,
            observations = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            provider = self.provider_name(),
            "loaded price series"
        );
        Ok(series)
    }
}

fn no_data_for(ticker: &str, start: NaiveDate, end: NaiveDate) -> RecommendError {
    RecommendError::no_data(format!(
        "not enough market data for {ticker} between {start} and {end} (need at least two trading days)"
    ))
}

/// Sort, dedupe (last bar per date wins), drop unusable closes, and scrub bad opens/volumes.
pub fn normalize_bars(
    ticker: &str,
    bars: Vec<RawPriceBar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PriceObservation> {
    let mut by_date = BTreeMap::<NaiveDate, RawPriceBar>::new();
    for bar in bars {
        if bar.date < start || bar.date > end {
            continue;
        }
        by_date.insert(bar.date, bar);
    }

    let mut dropped: usize = 0;
    let mut out = Vec::with_capacity(by_date.len());
    for (date, bar) in by_date {
        let Some(close) = bar.close.filter(|c| c.is_finite() && *c > 0.0) else {
            dropped += 1;
            continue;
        };
        out.push(PriceObservation {
            date,
            close,
            volume: bar.volume.filter(|v| v.is_finite() && *v >= 0.0),
            open: bar.open.filter(|o| o.is_finite() && *o > 0.0),
        });
    }

    if dropped > 0 {
        tracing::warn!(%ticker, dropped, "dropped bars without a usable close");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: Option<f64>) -> RawPriceBar {
        RawPriceBar {
            date,
            open: None,
            close,
            volume: Some(1000.0),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
    }

    struct FakeSource {
        bars: Vec<RawPriceBar>,
        calls: AtomicUsize,
        delay: Option<Duration>,
        not_found: bool,
        unavailable: bool,
    }

    impl FakeSource {
        fn with_bars(bars: Vec<RawPriceBar>) -> Self {
            Self {
                bars,
                calls: AtomicUsize::new(0),
                delay: None,
                not_found: false,
                unavailable: false,
            }
        }
    }

    #[async_trait::async_trait]
    impl PriceSource for FakeSource {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_daily_bars(
            &self,
            ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<RawPriceBar>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.not_found {
                return Err(SourceError::NotFound(ticker.to_string()));
            }
            if self.unavailable {
                return Err(SourceError::Other(anyhow::anyhow!("HTTP 503 Service Unavailable")));
            }
            Ok(self.bars.clone())
        }
    }

    #[test]
    fn normalize_sorts_dedupes_and_drops_bad_closes() {
        let bars = vec![
            bar(d(1, 4), Some(12.0)),
            bar(d(1, 2), Some(10.0)),
            bar(d(1, 3), None),
            bar(d(1, 5), Some(-1.0)),
            bar(d(1, 4), Some(13.0)),
            RawPriceBar {
                date: d(1, 8),
                open: Some(f64::NAN),
                close: Some(14.0),
                volume: Some(-5.0),
            },
        ];
        let obs = normalize_bars("AAPL", bars, d(1, 1), d(1, 31));
        let dates: Vec<_> = obs.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(1, 2), d(1, 4), d(1, 8)]);
        assert_eq!(obs[1].close, 13.0);
        assert_eq!(obs[2].open, None);
        assert_eq!(obs[2].volume, None);
    }

    #[test]
    fn normalize_drops_bars_outside_window() {
        let bars = vec![bar(d(1, 2), Some(10.0)), bar(d(3, 1), Some(11.0))];
        let obs = normalize_bars("AAPL", bars, d(1, 1), d(1, 31));
        assert_eq!(obs.len(), 1);
    }

    #[tokio::test]
    async fn loads_valid_series() {
        let source = Arc::new(FakeSource::with_bars(vec![
            bar(d(1, 2), Some(100.0)),
            bar(d(1, 3), Some(105.0)),
            bar(d(1, 4), Some(99.0)),
        ]));
        let loader = SeriesLoader::new(source, Duration::from_secs(5));
        let series = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.ticker(), "AAPL");
    }

    #[tokio::test]
    async fn single_observation_is_no_data() {
        let source = Arc::new(FakeSource::with_bars(vec![bar(d(1, 2), Some(100.0))]));
        let loader = SeriesLoader::new(source, Duration::from_secs(5));
        let err = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDataAvailable);
    }

    #[tokio::test]
    async fn unknown_symbol_is_no_data() {
        let mut source = FakeSource::with_bars(Vec::new());
        source.not_found = true;
        let loader = SeriesLoader::new(Arc::new(source), Duration::from_secs(5));
        let err = loader.load("ZZZZ", d(1, 1), d(1, 31), now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDataAvailable);
    }

    #[tokio::test]
    async fn source_failure_is_upstream_unavailable() {
        let mut source = FakeSource::with_bars(Vec::new());
        source.unavailable = true;
        let source = Arc::new(source);
        let cache = Arc::new(PriceCache::new(Duration::from_secs(300)));
        let loader = SeriesLoader::new(source.clone(), Duration::from_secs(5))
            .with_cache(cache.clone());

        let err = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert!(err.is_retryable());
        assert!(cache.is_empty());

        let RecommendError::UpstreamUnavailable(cause) = err else {
            panic!("unexpected variant");
        };
        let chain = format!("{cause:#}");
        assert!(chain.contains("fetching AAPL from fake"), "{chain}");
        assert!(chain.contains("503"), "{chain}");
    }

    #[tokio::test]
    async fn future_range_fails_without_fetching() {
        let source = Arc::new(FakeSource::with_bars(Vec::new()));
        let loader = SeriesLoader::new(source.clone(), Duration::from_secs(5));
        let start = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2030, 2, 1).unwrap();
        let err = loader.load("ZZZZ", start, end, now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDataAvailable);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let mut source = FakeSource::with_bars(vec![bar(d(1, 2), Some(1.0)), bar(d(1, 3), Some(2.0))]);
        source.delay = Some(Duration::from_secs(30));
        let loader = SeriesLoader::new(Arc::new(source), Duration::from_secs(2));
        let err = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamTimeout);
    }

    #[tokio::test]
    async fn cache_serves_repeat_requests() {
        let source = Arc::new(FakeSource::with_bars(vec![
            bar(d(1, 2), Some(100.0)),
            bar(d(1, 3), Some(101.0)),
        ]));
        let cache = Arc::new(PriceCache::new(Duration::from_secs(300)));
        let loader = SeriesLoader::new(source.clone(), Duration::from_secs(5)).with_cache(cache);

        let a = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap();
        let b = loader.load("AAPL", d(1, 1), d(1, 31), now()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
