use std::sync::Arc;

use thiserror::Error;

use crate::{
    application::repos::{CreateGroupParams, GroupsRepo, RepoError},
    domain::{
        entities::GroupRecord,
        slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug},
    },
};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group title must not be empty")]
    EmptyTitle,
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for GroupError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => GroupError::Slug(err),
            SlugAsyncError::Predicate(err) => GroupError::Repo(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    /// Create a group. Without an explicit slug one is derived from the title.
    pub async fn create_group(&self, cmd: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = cmd.title.trim().to_string();
        if title.is_empty() {
            return Err(GroupError::EmptyTitle);
        }

        let slug = match cmd.slug {
            Some(slug) => {
                let slug = slug.trim().to_string();
                validate_slug(&slug)?;
                if self.groups.find_by_slug(&slug).await?.is_some() {
                    return Err(GroupError::SlugTaken(slug));
                }
                slug
            }
            None => {
                let groups = self.groups.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let groups = groups.clone();
                    let candidate = candidate.to_string();
                    async move {
                        let existing = groups.find_by_slug(&candidate).await?;
                        Ok::<bool, RepoError>(existing.is_none())
                    }
                })
                .await?
            }
        };

        match self
            .groups
            .create_group(CreateGroupParams {
                slug: slug.clone(),
                title,
                description: cmd.description.trim().to_string(),
            })
            .await
        {
            Ok(group) => Ok(group),
            Err(RepoError::Duplicate { .. }) => Err(GroupError::SlugTaken(slug)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.groups.list_groups().await?)
    }
}
