use super::clock::Timestamp;
use super::currency::{CurrencyCode, RateTable};
use chrono::Duration;
use std::collections::HashMap;
use tracing::debug;

/// Rates fetched for one base currency and when they were fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub base: CurrencyCode,
    pub rates: RateTable,
    pub fetched_at: Timestamp,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// Rate tables keyed by base currency.
///
/// Entries are never evicted; staleness is decided by the reader.
#[derive(Debug, Default)]
pub struct RateCache {
    entries: HashMap<CurrencyCode, CacheEntry>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, base: CurrencyCode) -> Option<&CacheEntry> {
        let entry = self.entries.get(&base);
        if entry.is_some() {
            debug!(%base, "Cache HIT");
        } else {
            debug!(%base, "Cache MISS");
        }
        entry
    }

    /// Returns the entry for `base` only if it is younger than `ttl`.
    pub fn get_fresh(
        &self,
        base: CurrencyCode,
        now: Timestamp,
        ttl: Duration,
    ) -> Option<&CacheEntry> {
        self.get(base).filter(|entry| {
            let fresh = entry.is_fresh(now, ttl);
            if !fresh {
                debug!(%base, fetched_at = %entry.fetched_at, "Cache entry stale");
            }
            fresh
        })
    }

    /// Replaces whatever was stored for `base`.
    pub fn put(&mut self, base: CurrencyCode, rates: RateTable, now: Timestamp) {
        debug!(%base, count = rates.len(), "Cache PUT");
        self.entries.insert(
            base,
            CacheEntry {
                base,
                rates,
                fetched_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn t0() -> Timestamp {
        DateTime::UNIX_EPOCH + Duration::days(20_000)
    }

    fn table(rate: f64) -> RateTable {
        [(CurrencyCode::USD, rate)].into_iter().collect()
    }

    #[test]
    fn test_cache_get_put() {
        let mut cache = RateCache::new();
        assert!(cache.get(CurrencyCode::EUR).is_none());

        cache.put(CurrencyCode::EUR, table(1.08), t0());
        let entry = cache.get(CurrencyCode::EUR).unwrap();
        assert_eq!(entry.base, CurrencyCode::EUR);
        assert_eq!(entry.rates.get(CurrencyCode::USD), Some(1.08));
        assert_eq!(entry.fetched_at, t0());

        assert!(cache.get(CurrencyCode::USD).is_none());
    }

    #[test]
    fn test_put_overwrites_without_merging() {
        let mut cache = RateCache::new();
        let first: RateTable = [(CurrencyCode::USD, 1.08), (CurrencyCode::JPY, 160.0)]
            .into_iter()
            .collect();
        cache.put(CurrencyCode::EUR, first, t0());
        cache.put(CurrencyCode::EUR, table(1.09), t0() + Duration::seconds(1));

        let entry = cache.get(CurrencyCode::EUR).unwrap();
        assert_eq!(entry.rates.len(), 1);
        assert_eq!(entry.rates.get(CurrencyCode::JPY), None);
        assert_eq!(entry.fetched_at, t0() + Duration::seconds(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_freshness_boundary() {
        let ttl = Duration::minutes(5);
        let mut cache = RateCache::new();
        cache.put(CurrencyCode::EUR, table(1.08), t0());

        let just_before = t0() + ttl - Duration::milliseconds(1);
        assert!(cache.get_fresh(CurrencyCode::EUR, just_before, ttl).is_some());
        // Age equal to the TTL is already stale.
        assert!(cache.get_fresh(CurrencyCode::EUR, t0() + ttl, ttl).is_none());
        // Stale entries stay readable.
        assert!(cache.get(CurrencyCode::EUR).is_some());
    }
}
