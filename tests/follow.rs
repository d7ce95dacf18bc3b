mod support;

use lectern::application::follow::{FollowDirection, FollowError, FollowOutcome};
use support::{MemoryStore, viewer_for};

#[tokio::test]
async fn following_twice_creates_one_edge() {
    let store = MemoryStore::new();
    let reader = store.add_user("anna").await;
    let author = store.add_user("leo").await;
    let follow = store.follow_service();
    let viewer = viewer_for(&reader);

    let first = follow
        .toggle_follow(&viewer, "leo", FollowDirection::Follow)
        .await
        .expect("first follow");
    let second = follow
        .toggle_follow(&viewer, "leo", FollowDirection::Follow)
        .await
        .expect("second follow");

    assert_eq!(first, FollowOutcome::Followed);
    assert_eq!(second, FollowOutcome::AlreadyFollowing);
    assert_eq!(store.follow_edges().await, vec![(reader.id, author.id)]);
}

#[tokio::test]
async fn self_follow_never_creates_an_edge() {
    let store = MemoryStore::new();
    let reader = store.add_user("anna").await;
    let follow = store.follow_service();

    let outcome = follow
        .toggle_follow(&viewer_for(&reader), "anna", FollowDirection::Follow)
        .await
        .expect("self follow is not an error");

    assert_eq!(outcome, FollowOutcome::SelfIgnored);
    assert!(store.follow_edges().await.is_empty());
}

#[tokio::test]
async fn unfollow_is_idempotent() {
    let store = MemoryStore::new();
    let reader = store.add_user("anna").await;
    let author = store.add_user("leo").await;
    store.add_follow(&reader, &author).await;
    let follow = store.follow_service();
    let viewer = viewer_for(&reader);

    let first = follow
        .toggle_follow(&viewer, "leo", FollowDirection::Unfollow)
        .await
        .expect("first unfollow");
    let second = follow
        .toggle_follow(&viewer, "leo", FollowDirection::Unfollow)
        .await
        .expect("second unfollow");

    assert_eq!(first, FollowOutcome::Unfollowed);
    assert_eq!(second, FollowOutcome::NotFollowing);
    assert!(store.follow_edges().await.is_empty());
}

#[tokio::test]
async fn unknown_target_is_reported() {
    let store = MemoryStore::new();
    let reader = store.add_user("anna").await;

    let err = store
        .follow_service()
        .toggle_follow(&viewer_for(&reader), "ghost", FollowDirection::Follow)
        .await
        .expect_err("unknown author");

    assert!(matches!(err, FollowError::UnknownAuthor(name) if name == "ghost"));
    assert!(store.follow_edges().await.is_empty());
}

#[tokio::test]
async fn concurrent_follows_leave_one_edge() {
    let store = MemoryStore::new();
    let reader = store.add_user("anna").await;
    store.add_user("leo").await;
    let follow = store.follow_service();
    let viewer = viewer_for(&reader);

    let (a, b) = tokio::join!(
        follow.toggle_follow(&viewer, "leo", FollowDirection::Follow),
        follow.toggle_follow(&viewer, "leo", FollowDirection::Follow),
    );
    let outcomes = [a.expect("first"), b.expect("second")];

    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| **outcome == FollowOutcome::Followed)
            .count(),
        1
    );
    assert_eq!(store.follow_edges().await.len(), 1);
}
