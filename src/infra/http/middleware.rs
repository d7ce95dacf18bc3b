use std::{convert::Infallible, sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::SESSION_COOKIE;
use crate::{
    application::{
        accounts::{AccountService, SessionError},
        error::{ErrorReport, HttpError},
    },
    domain::access::Viewer,
};

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Resolve the session cookie into a [`Viewer`] request extension.
///
/// Missing, malformed, and expired sessions leave the request anonymous. A
/// session store failure ends the request with a server error.
pub async fn attach_viewer(
    State(accounts): State<Arc<AccountService>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match accounts.authenticate(cookie.value()).await {
            Ok(viewer) => {
                request.extensions_mut().insert(viewer);
            }
            Err(SessionError::Repo(err)) => {
                error!(
                    target = "lectern::http::session",
                    method = %request.method(),
                    path = %request.uri().path(),
                    error = %err,
                    "session lookup failed"
                );
                return HttpError::from_repo("infra::http::middleware::attach_viewer", &err)
                    .into_response();
            }
            Err(err) => {
                debug!(
                    target = "lectern::http::session",
                    error = %err,
                    "ignoring session cookie"
                );
            }
        }
    }

    next.run(request).await
}

/// The signed-in viewer, if any.
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Option<Viewer>);

impl CurrentViewer {
    pub fn viewer(&self) -> Option<&Viewer> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Viewer>().cloned()))
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let viewer_id = request
        .extensions()
        .get::<Viewer>()
        .map(|viewer| viewer.user_id.to_string());

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "lectern::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                viewer_id = viewer_id.as_deref().unwrap_or(""),
                "request failed",
            );
        } else {
            warn!(
                target = "lectern::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                viewer_id = viewer_id.as_deref().unwrap_or(""),
                "client request error",
            );
        }
    }

    response
}
