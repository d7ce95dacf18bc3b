//! In-memory repositories for integration tests.

#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use lectern::{
    application::{
        accounts::AccountService,
        feed::FeedService,
        follow::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateSessionParams, CreateUserParams, FollowsRepo, GroupsRepo, HealthRepo,
            PostFilter, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UpdatePostParams,
            UsersRepo,
        },
    },
    cache::CacheState,
    domain::{
        access::Viewer,
        entities::{
            AuthorRef, CommentRecord, GroupRecord, GroupRef, PostListItem, PostRecord,
            SessionRecord, UserRecord,
        },
    },
    infra::{
        http::{HttpState, SESSION_COOKIE},
        uploads::UploadStorage,
    },
};
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<(i64, i64, i64, String, OffsetDateTime)>,
    follows: Vec<(i64, i64)>,
    sessions: Vec<SessionRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn author_ref(&self, id: i64) -> Result<AuthorRef, RepoError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| AuthorRef {
                id: user.id,
                username: user.username.clone(),
                full_name: user.full_name.clone(),
            })
            .ok_or(RepoError::Integrity {
                message: format!("unknown user {id}"),
            })
    }

    fn list_item(&self, post: &PostRecord) -> Result<PostListItem, RepoError> {
        let group = post.group_id.and_then(|group_id| {
            self.groups
                .iter()
                .find(|group| group.id == group_id)
                .map(|group| GroupRef {
                    id: group.id,
                    slug: group.slug.clone(),
                    title: group.title.clone(),
                })
        });
        Ok(PostListItem {
            id: post.id,
            text: post.text.clone(),
            image_path: post.image_path.clone(),
            author: self.author_ref(post.author_id)?,
            group,
            created_at: post.created_at,
        })
    }

    fn matches(&self, post: &PostRecord, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|&(follower, author)| follower == user_id && author == post.author_id),
        }
    }

    fn filtered(&self, filter: PostFilter) -> Vec<&PostRecord> {
        let mut posts: Vec<&PostRecord> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

/// All repositories over one shared set of tables.
///
/// Posts get strictly increasing timestamps so feed order is deterministic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    sessions_down: Arc<AtomicBool>,
}

pub const EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str) -> UserRecord {
        self.create_user(CreateUserParams {
            username: username.to_string(),
            full_name: String::new(),
            password_hash: String::new(),
        })
        .await
        .expect("user inserts")
    }

    pub async fn add_user_with_password(&self, username: &str, password: &str) -> UserRecord {
        let password_hash =
            lectern::application::accounts::hash_password(password).expect("password hashes");
        self.create_user(CreateUserParams {
            username: username.to_string(),
            full_name: String::new(),
            password_hash,
        })
        .await
        .expect("user inserts")
    }

    pub async fn add_group(&self, slug: &str, title: &str) -> GroupRecord {
        self.create_group(CreateGroupParams {
            slug: slug.to_string(),
            title: title.to_string(),
            description: String::new(),
        })
        .await
        .expect("group inserts")
    }

    pub async fn add_post(&self, author: &UserRecord, group: Option<&GroupRecord>, text: &str) -> PostRecord {
        self.create_post(CreatePostParams {
            author_id: author.id,
            group_id: group.map(|group| group.id),
            text: text.to_string(),
            image_path: None,
        })
        .await
        .expect("post inserts")
    }

    pub async fn add_follow(&self, user: &UserRecord, author: &UserRecord) {
        self.create_follow_edge_if_absent(user.id, author.id)
            .await
            .expect("follow inserts");
    }

    /// Give a post an explicit creation time.
    pub async fn set_post_created_at(&self, id: i64, created_at: OffsetDateTime) {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == id)
            .expect("post exists");
        post.created_at = created_at;
        post.updated_at = created_at;
    }

    /// Make every later session lookup fail as if the database were unreachable.
    pub fn fail_session_lookups(&self) {
        self.sessions_down.store(true, Ordering::SeqCst);
    }

    pub async fn follow_edges(&self) -> Vec<(i64, i64)> {
        self.tables.lock().await.follows.clone()
    }

    pub async fn comment_count(&self) -> usize {
        self.tables.lock().await.comments.len()
    }

    pub async fn post(&self, id: i64) -> Option<PostRecord> {
        self.tables
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn feed_service(&self) -> FeedService {
        FeedService::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    pub fn follow_service(&self) -> FollowService {
        FollowService::new(Arc::new(self.clone()), Arc::new(self.clone()))
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// Public-listener state over this store, with uploads under `media_root`.
    pub fn http_state(&self, media_root: &Path, cache: CacheState) -> HttpState {
        HttpState {
            feed: Arc::new(self.feed_service()),
            posts: Arc::new(self.post_service()),
            follow: Arc::new(self.follow_service()),
            accounts: Arc::new(self.account_service()),
            health: Arc::new(self.clone()),
            upload_storage: Arc::new(
                UploadStorage::new(media_root.to_path_buf()).expect("media root"),
            ),
            cache,
            secure_cookie: false,
            upload_body_limit: 1024 * 1024,
        }
    }

    /// Session cookie header value for `username`.
    pub async fn session_cookie(&self, username: &str, password: &str) -> String {
        let session = self
            .account_service()
            .login(username, password)
            .await
            .expect("login succeeds");
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub fn account_service(&self) -> AccountService {
        AccountService::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Duration::hours(1),
        )
    }
}

pub fn viewer_for(user: &UserRecord) -> Viewer {
    Viewer {
        user_id: user.id,
        username: user.username.clone(),
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let id = tables.next_id();
        let user = UserRecord {
            id,
            username: params.username,
            full_name: params.full_name,
            password_hash: params.password_hash,
            created_at: EPOCH,
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.groups.iter().find(|group| group.id == id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut groups = tables.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        if tables.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let id = tables.next_id();
        let group = GroupRecord {
            id,
            slug: params.slug,
            title: params.title,
            description: params.description,
            created_at: EPOCH,
        };
        tables.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn count_posts(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.filtered(filter).len() as u64)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostListItem>, RepoError> {
        let tables = self.tables.lock().await;
        tables
            .filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| tables.list_item(post))
            .collect()
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn find_post_item(&self, id: i64) -> Result<Option<PostListItem>, RepoError> {
        let tables = self.tables.lock().await;
        tables
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| tables.list_item(post))
            .transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let created_at = EPOCH + Duration::seconds(id);
        let post = PostRecord {
            id,
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image_path: params.image_path,
            created_at,
            updated_at: created_at,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.group_id = params.group_id;
        post.text = params.text;
        post.image_path = params.image_path;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|comment| comment.1 != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.lock().await;
        tables
            .comments
            .iter()
            .filter(|comment| comment.1 == post_id)
            .map(|(id, post_id, author_id, text, created_at)| {
                Ok(CommentRecord {
                    id: *id,
                    post_id: *post_id,
                    author: tables.author_ref(*author_id)?,
                    text: text.clone(),
                    created_at: *created_at,
                })
            })
            .collect()
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let created_at = EPOCH + Duration::seconds(id);
        let author = tables.author_ref(params.author_id)?;
        tables.comments.push((
            id,
            params.post_id,
            params.author_id,
            params.text.clone(),
            created_at,
        ));
        Ok(CommentRecord {
            id,
            post_id: params.post_id,
            author,
            text: params.text,
            created_at,
        })
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn create_follow_edge_if_absent(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        if user_id == author_id {
            return Err(RepoError::Integrity {
                message: "follows_no_self_follow".to_string(),
            });
        }
        if tables.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        tables.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn delete_follow_edge_if_present(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().await;
        let before = tables.follows.len();
        tables.follows.retain(|&edge| edge != (user_id, author_id));
        Ok(tables.follows.len() != before)
    }

    async fn exists_follow_edge(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables.follows.contains(&(user_id, author_id)))
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .filter(|&&(_, author)| author == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .follows
            .iter()
            .filter(|&&(follower, _)| follower == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let session = SessionRecord {
            id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            user_id: params.user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
        };
        tables.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<SessionRecord>, RepoError> {
        if self.sessions_down.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .iter()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().await;
        tables.sessions.retain(|session| session.prefix != prefix);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
