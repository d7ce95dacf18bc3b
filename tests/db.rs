//! Repository tests against a live Postgres (`DATABASE_URL`).

use lectern::{
    application::repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
        FollowsRepo, GroupsRepo, PostFilter, PostsRepo, PostsWriteRepo, RepoError,
        UpdatePostParams, UsersRepo,
    },
    domain::entities::UserRecord,
    infra::db::PostgresRepositories,
};
use sqlx::PgPool;

async fn user(repos: &PostgresRepositories, username: &str) -> UserRecord {
    repos
        .create_user(CreateUserParams {
            username: username.to_string(),
            full_name: String::new(),
            password_hash: "x".to_string(),
        })
        .await
        .expect("user inserts")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn follow_edges_are_unique_and_never_self(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let anna = user(&repos, "anna").await;
    let leo = user(&repos, "leo").await;

    assert!(repos.create_follow_edge_if_absent(anna.id, leo.id).await.expect("follow"));
    assert!(!repos.create_follow_edge_if_absent(anna.id, leo.id).await.expect("refollow"));
    assert_eq!(repos.count_followers(leo.id).await.expect("count"), 1);

    let err = repos
        .create_follow_edge_if_absent(anna.id, anna.id)
        .await
        .expect_err("self follow violates check");
    assert!(matches!(err, RepoError::Integrity { .. }));

    assert!(repos.delete_follow_edge_if_present(anna.id, leo.id).await.expect("unfollow"));
    assert!(!repos.delete_follow_edge_if_present(anna.id, leo.id).await.expect("again"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_usernames_are_reported(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    user(&repos, "anna").await;

    let err = repos
        .create_user(CreateUserParams {
            username: "anna".to_string(),
            full_name: String::new(),
            password_hash: "x".to_string(),
        })
        .await
        .expect_err("duplicate");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn feed_filters_select_and_order_posts(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let anna = user(&repos, "anna").await;
    let leo = user(&repos, "leo").await;
    let novels = repos
        .create_group(CreateGroupParams {
            slug: "novels".to_string(),
            title: "Novels".to_string(),
            description: String::new(),
        })
        .await
        .expect("group");

    let mut ids = Vec::new();
    for n in 0..3 {
        let post = repos
            .create_post(CreatePostParams {
                author_id: leo.id,
                group_id: (n != 1).then_some(novels.id),
                text: format!("post {n}"),
                image_path: None,
            })
            .await
            .expect("post");
        ids.push(post.id);
    }

    let all = repos.list_posts(PostFilter::All, 0, 10).await.expect("all");
    let listed: Vec<i64> = all.iter().map(|item| item.id).collect();
    ids.reverse();
    assert_eq!(listed, ids);

    assert_eq!(repos.count_posts(PostFilter::Group(novels.id)).await.expect("group"), 2);
    assert_eq!(repos.count_posts(PostFilter::Author(anna.id)).await.expect("author"), 0);
    assert_eq!(repos.count_posts(PostFilter::FollowedBy(anna.id)).await.expect("none"), 0);

    repos.create_follow_edge_if_absent(anna.id, leo.id).await.expect("follow");
    assert_eq!(repos.count_posts(PostFilter::FollowedBy(anna.id)).await.expect("some"), 3);

    let moved = repos
        .update_post(UpdatePostParams {
            id: ids[0],
            group_id: None,
            text: "moved".to_string(),
            image_path: None,
        })
        .await
        .expect("update");
    assert_eq!(moved.group_id, None);
    assert_eq!(repos.count_posts(PostFilter::Group(novels.id)).await.expect("group"), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comments_list_oldest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let leo = user(&repos, "leo").await;
    let post = repos
        .create_post(CreatePostParams {
            author_id: leo.id,
            group_id: None,
            text: "hello".to_string(),
            image_path: None,
        })
        .await
        .expect("post");

    for text in ["first", "second"] {
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: leo.id,
                text: text.to_string(),
            })
            .await
            .expect("comment");
    }

    let comments = repos.list_for_post(post.id).await.expect("comments");
    let texts: Vec<&str> = comments.iter().map(|comment| comment.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(comments[0].author.username, "leo");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn equal_timestamps_fall_back_to_newest_id(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let leo = user(&repos, "leo").await;

    let mut ids: Vec<i64> = sqlx::query_scalar(
        "INSERT INTO posts (author_id, text, created_at, updated_at) \
         VALUES ($1, 'first', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z'), \
                ($1, 'second', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z') \
         RETURNING id",
    )
    .bind(leo.id)
    .fetch_all(&pool)
    .await
    .expect("posts insert");
    ids.sort_unstable();
    let expected: Vec<i64> = ids.iter().rev().copied().collect();

    let listed: Vec<i64> = repos
        .list_posts(PostFilter::All, 0, 10)
        .await
        .expect("list")
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(listed, expected);

    let authored: Vec<i64> = repos
        .list_posts(PostFilter::Author(leo.id), 0, 10)
        .await
        .expect("author list")
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(authored, expected);
}
