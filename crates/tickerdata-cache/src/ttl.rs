//! Bounded TTL cache with least-recently-used eviction.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tickerdata_core::{CacheSettings, Clock, Result, SystemClock};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

/// Cache entry with insertion time for TTL expiry and an access tick for LRU.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    cached_at: DateTime<Utc>,
    last_access: u64,
}

impl<V> CacheEntry<V> {
    fn is_stale(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.cached_at) >= ttl
    }
}

/// Counters describing cache activity since creation or the last clear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a live entry.
    pub hits: u64,
    /// Lookups that found nothing live.
    pub misses: u64,
    /// Values stored.
    pub insertions: u64,
    /// Live entries dropped to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL ran out.
    pub expirations: u64,
}

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    tick: u64,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> CacheState<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn purge_expired(&mut self, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now, ttl));
        let removed = before - self.entries.len();
        self.stats.expirations += removed as u64;
        removed
    }

    fn evict_lru(&mut self) -> Option<K> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&key);
        self.stats.evictions += 1;
        Some(key)
    }
}

/// A bounded in-memory cache whose entries expire a fixed time after insertion.
///
/// At most `max_size` entries are held; when an insert would exceed that,
/// expired entries are dropped first and then the least recently used entry.
/// Expiry is lazy: an expired entry is treated as absent on lookup.
///
/// Finding the least recently used entry scans every entry, so an insert into
/// a full cache costs O(`max_size`). Keep capacities in the hundreds.
///
/// State sits behind a `tokio` mutex, so a cache can be shared between tasks.
/// The lock is not held while a value is being computed, which means
/// concurrent misses on one key each run their computation and the last one
/// to finish wins.
pub struct TtlCache<K, V> {
    label: &'static str,
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("label", &self.label)
            .field("max_size", &self.max_size)
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send,
    V: Clone + Send,
{
    /// Creates an empty cache. `label` names the cache in log events.
    ///
    /// Fails if `settings.max_size` is zero.
    pub fn new(label: &'static str, settings: CacheSettings) -> Result<Self> {
        settings.validate(label)?;
        Ok(Self {
            label,
            max_size: settings.max_size,
            ttl: settings.ttl(),
            clock: Arc::new(SystemClock),
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(settings.max_size),
                tick: 0,
                stats: CacheStats::default(),
            }),
        })
    }

    /// Replaces the time source used for expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Name used in log events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.max_size
    }

    /// Time an entry stays live after insertion.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX)
    }

    /// Returns a clone of the live value for `key`, refreshing its recency.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        let mut state = self.state.lock().await;
        let tick = state.next_tick();

        let stale = match state.entries.get_mut(key) {
            Some(entry) if !entry.is_stale(now, ttl) => {
                entry.last_access = tick;
                let data = entry.data.clone();
                state.stats.hits += 1;
                trace!(cache = self.label, ?key, "Cache hit");
                return Some(data);
            }
            Some(_) => true,
            None => false,
        };

        if stale {
            state.entries.remove(key);
            state.stats.expirations += 1;
            debug!(cache = self.label, ?key, "Cache entry expired");
        }
        state.stats.misses += 1;
        trace!(cache = self.label, ?key, "Cache miss");
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub async fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        let mut state = self.state.lock().await;
        let tick = state.next_tick();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_size {
            state.purge_expired(now, ttl);
            while state.entries.len() >= self.max_size {
                match state.evict_lru() {
                    Some(evicted) => {
                        debug!(cache = self.label, key = ?evicted, "Evicted least recently used entry");
                    }
                    None => break,
                }
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                data: value,
                cached_at: now,
                last_access: tick,
            },
        );
        state.stats.insertions += 1;
    }

    /// Returns the live value for `key`, or computes, stores and returns it.
    #[instrument(skip(self, compute), fields(cache = self.label))]
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key).await {
            debug!("Cache hit");
            return value;
        }

        debug!("Cache miss, computing value");
        let value = compute().await;
        self.insert(key, value.clone()).await;
        value
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible work.
    ///
    /// An error is handed back to the caller and nothing is stored, so the
    /// next lookup for `key` computes again.
    #[instrument(skip(self, compute), fields(cache = self.label))]
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        key: K,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            debug!("Cache hit");
            return Ok(value);
        }

        debug!("Cache miss, computing value");
        let value = compute().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Removes the entry for `key`, returning its value if it was live.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        let mut state = self.state.lock().await;
        state
            .entries
            .remove(key)
            .filter(|entry| !entry.is_stale(now, ttl))
            .map(|entry| entry.data)
    }

    /// Drops every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        let removed = self.state.lock().await.purge_expired(now, ttl);
        if removed > 0 {
            debug!(cache = self.label, removed, "Purged expired cache entries");
        }
        removed
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        self.state
            .lock()
            .await
            .entries
            .values()
            .filter(|entry| !entry.is_stale(now, ttl))
            .count()
    }

    /// Returns true if there are no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns true if `key` has a live entry. Does not touch recency.
    pub async fn contains_key(&self, key: &K) -> bool {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        self.state
            .lock()
            .await
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_stale(now, ttl))
    }

    /// Snapshot of the activity counters.
    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats
    }

    /// Removes all entries and resets the counters.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.stats = CacheStats::default();
        debug!(cache = self.label, "Cleared cache");
    }
}
