//! Feed assembly: the four post listings and their pagination.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
    application::{
        pagination::{Page, PageRequest},
        repos::{FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo},
    },
    domain::{
        access::Viewer,
        entities::{GroupRecord, PostListItem, UserRecord},
    },
};

/// Which listing to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    Global,
    Group(String),
    Profile(String),
    Following,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("group `{0}` does not exist")]
    UnknownGroup(String),
    #[error("user `{0}` does not exist")]
    UnknownAuthor(String),
    #[error("this feed requires a signed-in viewer")]
    Unauthenticated,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Author details shown above a profile feed.
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub author: UserRecord,
    /// Whether the current viewer follows this author. Always false for anonymous viewers.
    pub following: bool,
    /// Whether the viewer is looking at their own profile.
    pub is_self: bool,
    pub followers: u64,
    pub follows: u64,
}

#[derive(Debug, Clone)]
pub enum FeedSubject {
    Global,
    Group(GroupRecord),
    Profile(Box<ProfileSummary>),
    Following,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub subject: FeedSubject,
    pub page: Page<PostListItem>,
}

#[derive(Clone)]
pub struct FeedService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FeedService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        follows: Arc<dyn FollowsRepo>,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            follows,
        }
    }

    /// Build one page of the requested feed.
    pub async fn get_page(
        &self,
        kind: &FeedKind,
        viewer: Option<&Viewer>,
        request: PageRequest,
    ) -> Result<FeedPage, FeedError> {
        let (subject, filter) = match kind {
            FeedKind::Global => (FeedSubject::Global, PostFilter::All),
            FeedKind::Group(slug) => {
                let group = self
                    .groups
                    .find_by_slug(slug)
                    .await?
                    .ok_or_else(|| FeedError::UnknownGroup(slug.clone()))?;
                let filter = PostFilter::Group(group.id);
                (FeedSubject::Group(group), filter)
            }
            FeedKind::Profile(username) => {
                let summary = self.profile_summary(username, viewer).await?;
                let filter = PostFilter::Author(summary.author.id);
                (FeedSubject::Profile(Box::new(summary)), filter)
            }
            FeedKind::Following => {
                let viewer = viewer.ok_or(FeedError::Unauthenticated)?;
                (FeedSubject::Following, PostFilter::FollowedBy(viewer.user_id))
            }
        };

        let page = self.paginate(filter, request).await?;
        debug!(
            target = "lectern::application::feed",
            feed = ?kind,
            page = page.number,
            total_items = page.total_items,
            "feed page assembled"
        );

        Ok(FeedPage { subject, page })
    }

    /// Count first, clamp the requested page, then fetch that slice.
    async fn paginate(
        &self,
        filter: PostFilter,
        request: PageRequest,
    ) -> Result<Page<PostListItem>, RepoError> {
        let total = self.posts.count_posts(filter).await?;
        let window = request.resolve(total);
        let items = self
            .posts
            .list_posts(filter, window.offset, window.limit)
            .await?;
        Ok(Page::new(items, window))
    }

    async fn profile_summary(
        &self,
        username: &str,
        viewer: Option<&Viewer>,
    ) -> Result<ProfileSummary, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let following = match viewer {
            Some(viewer) if viewer.user_id != author.id => {
                self.follows
                    .exists_follow_edge(viewer.user_id, author.id)
                    .await?
            }
            _ => false,
        };
        let is_self = viewer.is_some_and(|viewer| viewer.user_id == author.id);
        let followers = self.follows.count_followers(author.id).await?;
        let follows = self.follows.count_following(author.id).await?;

        Ok(ProfileSummary {
            author,
            following,
            is_self,
            followers,
            follows,
        })
    }
}
