//! In-memory storage of rendered pages.

use std::{sync::RwLock, time::Duration};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::{
    config::CacheConfig,
    keys::PageKey,
    lock::{rw_read, rw_write},
};

const SOURCE: &str = "cache::store";

pub const METRIC_PAGE_CACHE_HIT: &str = "lectern_page_cache_hit_total";
pub const METRIC_PAGE_CACHE_MISS: &str = "lectern_page_cache_miss_total";
pub const METRIC_PAGE_CACHE_EXPIRED: &str = "lectern_page_cache_expired_total";
pub const METRIC_PAGE_CACHE_EVICT: &str = "lectern_page_cache_evict_total";
pub const METRIC_PAGE_CACHE_INVALIDATE: &str = "lectern_page_cache_invalidate_total";

/// A fully buffered response, replayed verbatim on a hit.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct StoredPage {
    response: CachedResponse,
    expires_at: Instant,
}

/// LRU of rendered pages with a fixed time-to-live.
///
/// Expiry is checked lazily on lookup. Time comes from `tokio::time`, so tests
/// running with a paused clock can step over the TTL.
pub struct PageCache {
    entries: RwLock<LruCache<PageKey, StoredPage>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            ttl: config.ttl(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "page_get");

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!(METRIC_PAGE_CACHE_HIT).increment(1);
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            counter!(METRIC_PAGE_CACHE_EXPIRED).increment(1);
        }
        counter!(METRIC_PAGE_CACHE_MISS).increment(1);
        None
    }

    /// Store `response` under `key`. Returns the key pushed out by the LRU bound, if any.
    pub fn set(&self, key: PageKey, response: CachedResponse) -> Option<PageKey> {
        let entry = StoredPage {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        let replaced = rw_write(&self.entries, SOURCE, "page_set").push(key.clone(), entry);

        match replaced {
            Some((old_key, _)) if old_key != key => {
                counter!(METRIC_PAGE_CACHE_EVICT).increment(1);
                Some(old_key)
            }
            _ => None,
        }
    }

    /// Drop every stored page. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "page_invalidate_all");
        let dropped = entries.len();
        entries.clear();
        counter!(METRIC_PAGE_CACHE_INVALIDATE).increment(1);
        dropped
    }

    /// Number of stored pages, including ones that expired but were not looked up since.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "page_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
