use crate::models::VideoRecord;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Default freshness window for cached channel listings.
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// Source of "now" in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        ManualClock(AtomicI64::new(start))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub videos: Vec<VideoRecord>,
    pub timestamp: i64,
}

/// Channel URL -> last retrieved videos.
///
/// Entries are never evicted; a stale entry is ignored on read and replaced
/// by the next `put` for the same key.
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self::with_clock(ttl_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            entries: RwLock::new(HashMap::new()),
            ttl_seconds,
            clock,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Fresh videos for `key` together with their age in seconds.
    pub fn get(&self, key: &str) -> Option<(Vec<VideoRecord>, i64)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        let age = self.clock.now() - entry.timestamp;

        if age < self.ttl_seconds {
            Some((entry.videos.clone(), age.max(0)))
        } else {
            debug!("Cache entry for {key} is stale ({age}s old)");
            None
        }
    }

    pub fn put(&self, key: &str, videos: Vec<VideoRecord>) {
        let entry = CacheEntry {
            videos,
            timestamp: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECONDS)
    }
}
