use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        follow::{FollowDirection, FollowError},
    },
    presentation::views::{LayoutChrome, profile_href, render_not_found_response},
};

use super::{HttpState, login_redirect, middleware::CurrentViewer};

pub(super) async fn follow_author(
    state: State<HttpState>,
    viewer: CurrentViewer,
    username: Path<String>,
    uri: Uri,
) -> Response {
    apply(state, viewer, username, uri, FollowDirection::Follow).await
}

pub(super) async fn unfollow_author(
    state: State<HttpState>,
    viewer: CurrentViewer,
    username: Path<String>,
    uri: Uri,
) -> Response {
    apply(state, viewer, username, uri, FollowDirection::Unfollow).await
}

/// Both directions end on the author's profile, whether or not the graph changed.
async fn apply(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(username): Path<String>,
    uri: Uri,
    direction: FollowDirection,
) -> Response {
    const SOURCE: &str = "infra::http::follow";

    let Some(current) = viewer.viewer() else {
        return login_redirect(uri.path());
    };

    match state
        .follow
        .toggle_follow(current, &username, direction)
        .await
    {
        Ok(_) => Redirect::to(&profile_href(&username)).into_response(),
        Err(err @ FollowError::UnknownAuthor(_)) => {
            let mut response = render_not_found_response(LayoutChrome::new(
                Some(current),
                uri.path(),
            ));
            ErrorReport::from_error(SOURCE, StatusCode::NOT_FOUND, &err).attach(&mut response);
            response
        }
        Err(FollowError::Repo(err)) => HttpError::from_repo(SOURCE, &err).into_response(),
    }
}
