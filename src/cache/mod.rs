//! Page cache for the anonymous global feed.
//!
//! Rendered responses for `/` are memoized per query string for a fixed TTL.
//! Entries go away on expiry, on LRU eviction, or when
//! [`CacheState::invalidate_global_feed_cache`] is called. Writes to posts do
//! not touch the cache, so readers may see a stale index until one of those
//! happens.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! capacity = 64
//! key_prefix = "index_page"
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use keys::{PageKey, hash_query, page_key};
pub use middleware::{CacheState, page_cache_layer};
pub use store::{
    CachedResponse, METRIC_PAGE_CACHE_EVICT, METRIC_PAGE_CACHE_EXPIRED, METRIC_PAGE_CACHE_HIT,
    METRIC_PAGE_CACHE_INVALIDATE, METRIC_PAGE_CACHE_MISS, PageCache,
};
