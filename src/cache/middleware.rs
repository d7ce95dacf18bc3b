//! Page cache middleware.
//!
//! Mounted on the global feed route only. Signed-in viewers bypass it
//! because their rendering carries their identity.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument, warn};

use super::{
    CacheConfig,
    keys::page_key,
    store::{CachedResponse, PageCache},
};
use crate::domain::access::Viewer;

/// Cache handle passed to the middleware and to whoever needs to clear it.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<PageCache>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(PageCache::new(&config));
        Self { config, store }
    }

    /// Forget every cached rendering of the global feed.
    pub fn invalidate_global_feed_cache(&self) -> usize {
        let dropped = self.store.invalidate_all();
        info!(
            target = "lectern::cache",
            dropped, "global feed cache invalidated"
        );
        dropped
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled
        || request.method() != Method::GET
        || request.extensions().get::<Viewer>().is_some()
    {
        return next.run(request).await;
    }

    let key = page_key(
        &cache.config.key_prefix,
        request.uri().path(),
        request.uri().query(),
    );

    if let Some(cached) = cache.store.get(&key) {
        debug!(cache = "page", outcome = "hit", key = %key, "serving cached page");
        return build_response(cached);
    }

    debug!(cache = "page", outcome = "miss", key = %key, "rendering page");
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, cache.config.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "page", error = %err, "failed to buffer page for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    cache.store.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
