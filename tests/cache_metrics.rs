use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
};
use lectern::cache::{
    CacheConfig, CacheState, METRIC_PAGE_CACHE_EVICT, METRIC_PAGE_CACHE_EXPIRED,
    METRIC_PAGE_CACHE_HIT, METRIC_PAGE_CACHE_INVALIDATE, METRIC_PAGE_CACHE_MISS,
    page_cache_layer,
};
use metrics_util::debugging::DebuggingRecorder;
use tower::ServiceExt;

#[tokio::test(start_paused = true)]
async fn page_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = CacheState::new(CacheConfig {
        capacity: 1,
        ..Default::default()
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/",
            get(move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "feed"
                }
            }),
        )
        .layer(middleware::from_fn_with_state(
            cache.clone(),
            page_cache_layer,
        ));

    let send = |uri: &'static str| {
        let app = app.clone();
        async move {
            let request = Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .expect("request should build");
            let response = app.oneshot(request).await.expect("router should respond");
            assert_eq!(response.status(), StatusCode::OK);
        }
    };

    // miss, hit, then a second page pushes the first out of a one-slot cache
    send("/").await;
    send("/").await;
    send("/?page=2").await;

    tokio::time::advance(Duration::from_secs(21)).await;
    send("/?page=2").await;

    cache.invalidate_global_feed_cache();

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        METRIC_PAGE_CACHE_HIT,
        METRIC_PAGE_CACHE_MISS,
        METRIC_PAGE_CACHE_EXPIRED,
        METRIC_PAGE_CACHE_EVICT,
        METRIC_PAGE_CACHE_INVALIDATE,
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
