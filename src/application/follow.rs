//! Follow and unfollow operations on the author graph.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    application::repos::{FollowsRepo, RepoError, UsersRepo},
    domain::access::Viewer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowDirection {
    Follow,
    Unfollow,
}

/// What a follow request did to the graph. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    Unfollowed,
    NotFollowing,
    /// Viewer targeted their own account; nothing changed.
    SelfIgnored,
}

impl FollowOutcome {
    pub fn changed_graph(self) -> bool {
        matches!(self, FollowOutcome::Followed | FollowOutcome::Unfollowed)
    }
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("user `{0}` does not exist")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Resolve `target_username` and apply `direction` on behalf of `viewer`.
    pub async fn toggle_follow(
        &self,
        viewer: &Viewer,
        target_username: &str,
        direction: FollowDirection,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self
            .users
            .find_by_username(target_username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(target_username.to_string()))?;

        let outcome = match direction {
            FollowDirection::Follow => self.follow(viewer.user_id, author.id).await?,
            FollowDirection::Unfollow => self.unfollow(viewer.user_id, author.id).await?,
        };

        if outcome.changed_graph() {
            info!(
                target = "lectern::application::follow",
                user_id = viewer.user_id,
                author_id = author.id,
                outcome = ?outcome,
                "follow graph updated"
            );
        }

        Ok(outcome)
    }

    /// Create the edge unless it exists or would point at the viewer.
    pub async fn follow(&self, user_id: i64, author_id: i64) -> Result<FollowOutcome, RepoError> {
        if user_id == author_id {
            return Ok(FollowOutcome::SelfIgnored);
        }
        let created = self
            .follows
            .create_follow_edge_if_absent(user_id, author_id)
            .await?;
        Ok(if created {
            FollowOutcome::Followed
        } else {
            FollowOutcome::AlreadyFollowing
        })
    }

    pub async fn unfollow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<FollowOutcome, RepoError> {
        if user_id == author_id {
            return Ok(FollowOutcome::SelfIgnored);
        }
        let removed = self
            .follows
            .delete_follow_edge_if_present(user_id, author_id)
            .await?;
        Ok(if removed {
            FollowOutcome::Unfollowed
        } else {
            FollowOutcome::NotFollowing
        })
    }
}
