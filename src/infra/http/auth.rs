//! Login, logout, and sign-up pages.

use axum::{
    Form,
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    application::{
        accounts::{AccountError, SessionIssued, SignupCommand},
        error::HttpError,
    },
    domain::error::DomainError,
    presentation::views::{
        LayoutChrome, LayoutContext, LoginTemplate, LoginView, SignupTemplate, SignupView,
        render_template_response,
    },
};

use super::{HttpState, SESSION_COOKIE, middleware::CurrentViewer, safe_next};

const SOURCE_BASE: &str = "infra::http::auth";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupForm {
    username: String,
    full_name: String,
    password: String,
}

pub(super) async fn login_form(
    viewer: CurrentViewer,
    uri: Uri,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref()).unwrap_or("/").to_string();
    let view = LoginView {
        signup_href: "/auth/signup/".to_string(),
        next,
        username: String::new(),
        error: None,
    };
    render_login(&viewer, &uri, view, StatusCode::OK)
}

pub(super) async fn login(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    jar: CookieJar,
    uri: Uri,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).unwrap_or("/").to_string();

    match state.accounts.login(&form.username, &form.password).await {
        Ok(session) => {
            info!(
                target = SOURCE_BASE,
                user_id = session.user.id,
                "viewer signed in"
            );
            let jar = jar.add(session_cookie(&session, state.secure_cookie));
            (jar, Redirect::to(&next)).into_response()
        }
        Err(AccountError::InvalidCredentials) => {
            let view = LoginView {
                signup_href: "/auth/signup/".to_string(),
                next,
                username: form.username,
                error: Some("Please enter a correct username and password.".to_string()),
            };
            render_login(&viewer, &uri, view, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(err) => account_error_response(err),
    }
}

pub(super) async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        return account_error_response(err);
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/")).into_response()
}

pub(super) async fn signup_form(viewer: CurrentViewer, uri: Uri) -> Response {
    let view = SignupView {
        username: String::new(),
        full_name: String::new(),
        errors: Vec::new(),
    };
    render_signup(&viewer, &uri, view, StatusCode::OK)
}

pub(super) async fn signup(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    jar: CookieJar,
    uri: Uri,
    Form(form): Form<SignupForm>,
) -> Response {
    let command = SignupCommand {
        username: form.username.clone(),
        full_name: form.full_name.clone(),
        password: form.password,
    };

    let error = match state.accounts.signup(command).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&session, state.secure_cookie));
            return (jar, Redirect::to("/")).into_response();
        }
        Err(AccountError::Validation(DomainError::Validation { message, .. })) => message,
        Err(err @ AccountError::UsernameTaken(_)) => err.to_string(),
        Err(err) => return account_error_response(err),
    };

    let view = SignupView {
        username: form.username,
        full_name: form.full_name,
        errors: vec![error],
    };
    render_signup(&viewer, &uri, view, StatusCode::UNPROCESSABLE_ENTITY)
}

fn session_cookie(session: &SessionIssued, secure: bool) -> Cookie<'static> {
    let expires = if session.expires_at > OffsetDateTime::now_utc() {
        session.expires_at
    } else {
        OffsetDateTime::now_utc()
    };
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .expires(expires)
        .build()
}

fn render_login(viewer: &CurrentViewer, uri: &Uri, view: LoginView, status: StatusCode) -> Response {
    let view = LayoutContext::new(LayoutChrome::new(viewer.viewer(), uri.path()), view);
    render_template_response(LoginTemplate { view }, status)
}

fn render_signup(
    viewer: &CurrentViewer,
    uri: &Uri,
    view: SignupView,
    status: StatusCode,
) -> Response {
    let view = LayoutContext::new(LayoutChrome::new(viewer.viewer(), uri.path()), view);
    render_template_response(SignupTemplate { view }, status)
}

fn account_error_response(err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => HttpError::from_repo(SOURCE_BASE, &err).into_response(),
        err => HttpError::from_error(
            SOURCE_BASE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unexpected error occurred",
            &err,
        )
        .into_response(),
    }
}
