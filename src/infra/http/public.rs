use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        accounts::AccountService,
        error::{ErrorReport, HttpError},
        feed::{FeedError, FeedKind, FeedService},
        follow::FollowService,
        pagination::PageRequest,
        posts::PostService,
        repos::HealthRepo,
    },
    cache::{CacheState, page_cache_layer},
    infra::uploads::{UploadStorage, UploadStorageError},
    presentation::views::{
        FeedTemplate, FeedView, LayoutChrome, LayoutContext, render_not_found_response,
        render_template_response,
    },
};

use super::{
    auth, db_health_response, follow, login_redirect,
    middleware::{CurrentViewer, attach_viewer, log_responses, set_request_context},
    posts,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follow: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: CacheState,
    /// Mark the session cookie `Secure`.
    pub secure_cookie: bool,
    pub upload_body_limit: usize,
}

pub fn build_router(state: HttpState) -> Router {
    // Only the anonymous global feed is memoized.
    let cached_index = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(
            state.cache.clone(),
            page_cache_layer,
        ));

    let authoring = Router::new()
        .route(
            "/create/",
            get(posts::new_post_form).post(posts::create_post),
        )
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_post_form).post(posts::update_post),
        )
        .layer(DefaultBodyLimit::max(state.upload_body_limit));

    let accounts = state.accounts.clone();

    cached_index
        .merge(authoring)
        .route("/group/{slug}/", get(group_feed))
        .route("/profile/{username}/", get(profile_feed))
        .route(
            "/profile/{username}/follow/",
            get(follow::follow_author).post(follow::follow_author),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(follow::unfollow_author).post(follow::unfollow_author),
        )
        .route("/follow/", get(following_feed))
        .route("/posts/{id}/", get(posts::post_detail))
        .route(
            "/posts/{id}/comment/",
            get(posts::comment_redirect).post(posts::add_comment),
        )
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(accounts, attach_viewer))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref())
    }
}

async fn index(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    render_feed(&state, &viewer, FeedKind::Global, &query, "/").await
}

async fn group_feed(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    render_feed(&state, &viewer, FeedKind::Group(slug), &query, uri.path()).await
}

async fn profile_feed(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    uri: Uri,
) -> Response {
    render_feed(
        &state,
        &viewer,
        FeedKind::Profile(username),
        &query,
        uri.path(),
    )
    .await
}

async fn following_feed(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    render_feed(&state, &viewer, FeedKind::Following, &query, "/follow/").await
}

async fn render_feed(
    state: &HttpState,
    viewer: &CurrentViewer,
    kind: FeedKind,
    query: &PageQuery,
    base_path: &str,
) -> Response {
    let chrome = LayoutChrome::new(viewer.viewer(), base_path);

    match state
        .feed
        .get_page(&kind, viewer.viewer(), query.request())
        .await
    {
        Ok(feed) => {
            let content = FeedView::from_feed(&feed, viewer.viewer(), base_path);
            let view = LayoutContext::new(chrome, content);
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome, base_path),
    }
}

fn feed_error_to_response(err: FeedError, chrome: LayoutChrome, path: &str) -> Response {
    const SOURCE: &str = "infra::http::public::feed_error_to_response";

    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(SOURCE, StatusCode::NOT_FOUND, &err).attach(&mut response);
            response
        }
        FeedError::Unauthenticated => login_redirect(path),
        FeedError::Repo(err) => HttpError::from_repo(SOURCE, &err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read media file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn fallback(viewer: CurrentViewer, uri: Uri) -> Response {
    render_not_found_response(LayoutChrome::new(viewer.viewer(), uri.path()))
}
