//! Post authoring, post detail, and comments.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    application::repos::{
        CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostFilter, PostsRepo,
        PostsWriteRepo, RepoError, UpdatePostParams,
    },
    domain::{
        access::{Access, Viewer, can_edit_post, require_viewer},
        entities::{CommentRecord, GroupRecord, PostListItem, PostRecord},
        error::DomainError,
        posts::{normalize_comment_text, normalize_post_text},
    },
};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post {0} does not exist")]
    NotFound(i64),
    #[error("group {0} does not exist")]
    UnknownGroup(i64),
    #[error("post {0} belongs to another author")]
    Forbidden(i64),
    #[error("sign-in required")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Submitted post form, before validation.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    /// Stored path of a freshly uploaded image. `None` keeps whatever the post had.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostListItem,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
            comments,
        }
    }

    pub async fn post_detail(&self, post_id: i64) -> Result<PostDetail, PostError> {
        let post = self
            .posts
            .find_post_item(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author.id))
            .await?;
        let comments = self.comments.list_for_post(post_id).await?;

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }

    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    /// Load a post for its edit form, enforcing that only the author may see it.
    pub async fn post_for_edit(
        &self,
        viewer: Option<&Viewer>,
        post_id: i64,
    ) -> Result<PostRecord, PostError> {
        if require_viewer(viewer) == Access::Unauthenticated {
            return Err(PostError::Unauthenticated);
        }
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(PostError::NotFound(post_id))?;

        match can_edit_post(viewer, post.author_id) {
            Access::Allowed => Ok(post),
            Access::Forbidden => Err(PostError::Forbidden(post_id)),
            Access::Unauthenticated => Err(PostError::Unauthenticated),
        }
    }

    pub async fn create_post(
        &self,
        viewer: Option<&Viewer>,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let viewer = viewer.ok_or(PostError::Unauthenticated)?;
        let text = normalize_post_text(&draft.text)?;
        self.ensure_group(draft.group_id).await?;

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                author_id: viewer.user_id,
                group_id: draft.group_id,
                text,
                image_path: draft.image_path,
            })
            .await?;

        info!(
            target = "lectern::application::posts",
            post_id = post.id,
            author_id = post.author_id,
            group_id = ?post.group_id,
            "post created"
        );
        Ok(post)
    }

    pub async fn edit_post(
        &self,
        viewer: Option<&Viewer>,
        post_id: i64,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let existing = self.post_for_edit(viewer, post_id).await?;
        let text = normalize_post_text(&draft.text)?;
        self.ensure_group(draft.group_id).await?;

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id: existing.id,
                group_id: draft.group_id,
                text,
                image_path: draft.image_path.or(existing.image_path),
            })
            .await?;

        info!(
            target = "lectern::application::posts",
            post_id = post.id,
            group_id = ?post.group_id,
            "post updated"
        );
        Ok(post)
    }

    pub async fn add_comment(
        &self,
        viewer: Option<&Viewer>,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, PostError> {
        let viewer = viewer.ok_or(PostError::Unauthenticated)?;
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(PostError::NotFound(post_id));
        }
        let text = normalize_comment_text(text)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: viewer.user_id,
                text,
            })
            .await?;
        Ok(comment)
    }

    async fn ensure_group(&self, group_id: Option<i64>) -> Result<(), PostError> {
        if let Some(id) = group_id
            && self.groups.find_by_id(id).await?.is_none()
        {
            return Err(PostError::UnknownGroup(id));
        }
        Ok(())
    }
}
