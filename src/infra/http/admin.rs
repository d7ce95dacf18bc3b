//! Operator endpoints, served on their own listener.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use crate::{application::repos::HealthRepo, cache::CacheState};

use super::{db_health_response, middleware::log_responses};

#[derive(Clone)]
pub struct AdminState {
    pub cache: CacheState,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_health/db", get(admin_health))
        .route("/cache", get(cache_status))
        .route("/cache/invalidate", post(invalidate_cache))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.health_check().await)
}

#[derive(Debug, Serialize)]
struct CacheStatus {
    entries: usize,
    ttl_seconds: u64,
}

async fn cache_status(State(state): State<AdminState>) -> Json<CacheStatus> {
    Json(CacheStatus {
        entries: state.cache.store.len(),
        ttl_seconds: state.cache.config.ttl_seconds,
    })
}

async fn invalidate_cache(State(state): State<AdminState>) -> Response {
    state.cache.invalidate_global_feed_cache();
    StatusCode::NO_CONTENT.into_response()
}
