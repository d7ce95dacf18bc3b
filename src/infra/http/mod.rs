mod admin;
mod auth;
mod follow;
mod middleware;
mod posts;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use middleware::{CurrentViewer, RequestContext};
pub use public::{HttpState, build_router};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{error::ErrorReport, repos::RepoError},
    presentation::views::login_href,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "lectern_session";

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// 303 to the login page, coming back to `next` afterwards.
fn login_redirect(next: &str) -> Response {
    Redirect::to(&login_href(next)).into_response()
}

/// Only local absolute paths are honoured as redirect targets.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.map(str::trim)
        .filter(|next| next.starts_with('/') && !next.starts_with("//") && !next.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_next_accepts_local_paths_only() {
        assert_eq!(safe_next(Some("/posts/3/")), Some("/posts/3/"));
        assert_eq!(safe_next(Some("//evil.example/")), None);
        assert_eq!(safe_next(Some("https://evil.example/")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }

    #[test]
    fn login_redirect_is_see_other() {
        let response = login_redirect("/follow/");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[axum::http::header::LOCATION],
            "/auth/login/?next=/follow/"
        );
    }
}
