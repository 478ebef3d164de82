use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone)]
struct CachedSeries {
    series: Arc<PriceSeries>,
    fetched_at: Instant,
}

/// Read-through cache of loaded series.
///
/// Entries older than the TTL are never returned. The lock is only held for map access, never
/// while fetching, so two requests racing on the same key both fetch and the later insert wins.
#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entries: RwLock<HashMap<SeriesKey, CachedSeries>>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        let entries = self.entries.read();
        let cached = entries.get(key)?;
        if cached.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        Some(Arc::clone(&cached.series))
    }

    pub fn insert(&self, key: SeriesKey, series: Arc<PriceSeries>) {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write();
        entries.retain(|_, c| now.duration_since(c.fetched_at) < ttl);
        entries.insert(
            key,
            CachedSeries {
                series,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
