//! Post detail, authoring forms, and comments.

use axum::{
    Form,
    extract::{Path, State, rejection::FormRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    Multipart,
    multipart::{MultipartError, MultipartRejection},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        posts::{PostDraft, PostError},
    },
    domain::{
        access::{Access, require_viewer},
        error::DomainError,
        posts::normalize_post_text,
    },
    infra::uploads::UploadStorageError,
    presentation::views::{
        LayoutChrome, LayoutContext, PostDetailView, PostFormTemplate, PostFormView,
        PostTemplate, post_href, profile_href, render_not_found_response,
        render_template_response,
    },
};

use super::{HttpState, login_redirect, middleware::CurrentViewer};

const SOURCE_BASE: &str = "infra::http::posts";

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    let chrome = LayoutChrome::new(viewer.viewer(), uri.path());
    match state.posts.post_detail(id).await {
        Ok(detail) => {
            let content = PostDetailView::from_detail(&detail, viewer.viewer());
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(err) => post_error_response(err, chrome, uri.path()),
    }
}

pub(super) async fn new_post_form(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    uri: Uri,
) -> Response {
    if require_viewer(viewer.viewer()) == Access::Unauthenticated {
        return login_redirect(uri.path());
    }
    let chrome = LayoutChrome::new(viewer.viewer(), uri.path());

    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };
    let form = PostFormView::new(uri.path(), false, "", &groups, None);
    render_form(chrome, form, StatusCode::OK)
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Some(current) = viewer.viewer() else {
        return login_redirect(uri.path());
    };
    let chrome = LayoutChrome::new(Some(current), uri.path());

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return rejection.into_response(),
    };
    let submission = match read_post_form(multipart).await {
        Ok(submission) => submission,
        Err(err) => return multipart_error_response(&err),
    };
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };

    let form = PostFormView::new(
        uri.path(),
        false,
        submission.text.clone(),
        &groups,
        submission.group_id.as_ref().ok().copied().flatten(),
    );
    let draft = match prepare_draft(&state, submission, form).await {
        Ok(draft) => draft,
        Err(form) => return render_form(chrome, *form, StatusCode::UNPROCESSABLE_ENTITY),
    };
    let stored_image = draft.image_path.clone();
    let (text, group_id) = (draft.text.clone(), draft.group_id);

    match state.posts.create_post(Some(current), draft).await {
        Ok(_) => Redirect::to(&profile_href(&current.username)).into_response(),
        Err(err) => {
            discard_image(&state, stored_image.as_deref()).await;
            let form = PostFormView::new(uri.path(), false, text, &groups, group_id);
            draft_error_response(err, chrome, form, uri.path())
        }
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    let chrome = LayoutChrome::new(viewer.viewer(), uri.path());

    let post = match state.posts.post_for_edit(viewer.viewer(), id).await {
        Ok(post) => post,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };

    let form = PostFormView::new(uri.path(), true, post.text.clone(), &groups, post.group_id)
        .with_current_image(post.image_path.as_deref());
    render_form(chrome, form, StatusCode::OK)
}

pub(super) async fn update_post(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(id): Path<i64>,
    uri: Uri,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let chrome = LayoutChrome::new(viewer.viewer(), uri.path());

    // Reject strangers before reading or storing anything they sent.
    let existing = match state.posts.post_for_edit(viewer.viewer(), id).await {
        Ok(post) => post,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return rejection.into_response(),
    };
    let submission = match read_post_form(multipart).await {
        Ok(submission) => submission,
        Err(err) => return multipart_error_response(&err),
    };
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return post_error_response(err, chrome, uri.path()),
    };

    let form = PostFormView::new(
        uri.path(),
        true,
        submission.text.clone(),
        &groups,
        submission.group_id.as_ref().ok().copied().flatten(),
    )
    .with_current_image(existing.image_path.as_deref());
    let draft = match prepare_draft(&state, submission, form).await {
        Ok(draft) => draft,
        Err(form) => return render_form(chrome, *form, StatusCode::UNPROCESSABLE_ENTITY),
    };
    let stored_image = draft.image_path.clone();
    let (text, group_id) = (draft.text.clone(), draft.group_id);

    match state.posts.edit_post(viewer.viewer(), id, draft).await {
        Ok(post) => Redirect::to(&post_href(post.id)).into_response(),
        Err(err) => {
            discard_image(&state, stored_image.as_deref()).await;
            let form = PostFormView::new(uri.path(), true, text, &groups, group_id)
                .with_current_image(existing.image_path.as_deref());
            draft_error_response(err, chrome, form, uri.path())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    viewer: CurrentViewer,
    Path(id): Path<i64>,
    uri: Uri,
    form: Result<Form<CommentForm>, FormRejection>,
) -> Response {
    if require_viewer(viewer.viewer()) == Access::Unauthenticated {
        return login_redirect(uri.path());
    }
    let chrome = LayoutChrome::new(viewer.viewer(), uri.path());

    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return rejection.into_response(),
    };
    match state.posts.add_comment(viewer.viewer(), id, &form.text).await {
        Ok(_) => Redirect::to(&post_href(id)).into_response(),
        // An empty comment is dropped silently.
        Err(PostError::Validation(_)) => Redirect::to(&post_href(id)).into_response(),
        Err(err) => post_error_response(err, chrome, uri.path()),
    }
}

/// The comment form only accepts POST; signed-in viewers are sent back to the post.
pub(super) async fn comment_redirect(
    viewer: CurrentViewer,
    Path(id): Path<i64>,
    uri: Uri,
) -> Response {
    if require_viewer(viewer.viewer()) == Access::Unauthenticated {
        return login_redirect(uri.path());
    }
    Redirect::to(&post_href(id)).into_response()
}

/// Fields of the multipart post form.
struct PostSubmission {
    text: String,
    /// `Err` carries the raw value when it is not a group id.
    group_id: Result<Option<i64>, String>,
    image: Option<ImageUpload>,
}

struct ImageUpload {
    filename: String,
    data: Bytes,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostSubmission, MultipartError> {
    let mut text = String::new();
    let mut group_raw = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("text") => text = field.text().await?,
            Some("group") => group_raw = field.text().await?,
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| "image".to_string());
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if !data.is_empty() {
                    image = Some(ImageUpload { filename, data });
                }
            }
            _ => {}
        }
    }

    Ok(PostSubmission {
        text,
        group_id: parse_group(&group_raw),
        image,
    })
}

fn parse_group(raw: &str) -> Result<Option<i64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| trimmed.to_string())
}

/// Check the submission and store its image. A rejected form comes back with errors filled in.
async fn prepare_draft(
    state: &HttpState,
    submission: PostSubmission,
    mut form: PostFormView,
) -> Result<PostDraft, Box<PostFormView>> {
    if let Err(err) = normalize_post_text(&submission.text) {
        form.text_error = Some(validation_message(&err));
    }
    let group_id = match submission.group_id {
        Ok(group_id) => group_id,
        Err(_) => {
            form.group_error = Some("Select a valid group.".to_string());
            None
        }
    };
    if form.has_errors() {
        return Err(Box::new(form));
    }

    let image_path = match submission.image {
        Some(upload) => {
            match state
                .upload_storage
                .store_image(&upload.filename, upload.data)
                .await
            {
                Ok(stored) => Some(stored.stored_path),
                Err(UploadStorageError::EmptyPayload | UploadStorageError::NotAnImage) => {
                    form.image_error = Some(
                        "Upload a valid image. The file was either not an image or corrupted."
                            .to_string(),
                    );
                    return Err(Box::new(form));
                }
                Err(err) => {
                    warn!(
                        target = SOURCE_BASE,
                        error = %err,
                        "failed to store uploaded image"
                    );
                    form.image_error = Some("The image could not be saved.".to_string());
                    return Err(Box::new(form));
                }
            }
        }
        None => None,
    };

    Ok(PostDraft {
        text: submission.text,
        group_id,
        image_path,
    })
}

async fn discard_image(state: &HttpState, stored_path: Option<&str>) {
    let Some(path) = stored_path else {
        return;
    };
    if let Err(err) = state.upload_storage.delete(path).await {
        warn!(
            target = SOURCE_BASE,
            path = %path,
            error = %err,
            "failed to remove orphaned image"
        );
    }
}

fn render_form(chrome: LayoutChrome, form: PostFormView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome, form);
    render_template_response(PostFormTemplate { view }, status)
}

fn validation_message(err: &DomainError) -> String {
    match err {
        DomainError::Validation { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Failures from the service after the form itself looked fine.
fn draft_error_response(
    err: PostError,
    chrome: LayoutChrome,
    mut form: PostFormView,
    path: &str,
) -> Response {
    match err {
        PostError::Validation(err) => {
            form.text_error = Some(validation_message(&err));
            render_form(chrome, form, StatusCode::UNPROCESSABLE_ENTITY)
        }
        PostError::UnknownGroup(_) => {
            form.group_error = Some("Select a valid group.".to_string());
            render_form(chrome, form, StatusCode::UNPROCESSABLE_ENTITY)
        }
        err => post_error_response(err, chrome, path),
    }
}

fn post_error_response(err: PostError, chrome: LayoutChrome, path: &str) -> Response {
    const SOURCE: &str = "infra::http::posts::post_error_response";

    match err {
        PostError::NotFound(_) => {
            let mut response = render_not_found_response(chrome);
            ErrorReport::from_error(SOURCE, StatusCode::NOT_FOUND, &err).attach(&mut response);
            response
        }
        PostError::Forbidden(id) => Redirect::to(&post_href(id)).into_response(),
        PostError::Unauthenticated => login_redirect(path),
        PostError::UnknownGroup(_) | PostError::Validation(_) => HttpError::from_error(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request could not be processed",
            &err,
        )
        .into_response(),
        PostError::Repo(err) => HttpError::from_repo(SOURCE, &err).into_response(),
    }
}

fn multipart_error_response(err: &MultipartError) -> Response {
    let status = err.status();
    let public_message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Upload is too large"
    } else {
        "Invalid form data"
    };
    HttpError::from_error(
        "infra::http::posts::read_post_form",
        status,
        public_message,
        err,
    )
    .into_response()
}
