mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use folio::db::Store;
use folio::domain::{Actor, AuthUser, PostId};
use folio::models::{CommentInput, NewUser, PostInput};
use folio::services::{BlogError, BlogService, ManualClock, SeaOrmBlogService};

async fn setup() -> (SeaOrmBlogService, Store, Arc<ManualClock>) {
    let config = common::test_config();
    let store = Store::new(&config.general.database_path).await.unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    (
        SeaOrmBlogService::new(store.clone(), clock.clone()),
        store,
        clock,
    )
}

fn author(username: &str) -> Actor {
    Actor::User(AuthUser {
        id: 1,
        username: username.to_string(),
        is_superuser: false,
    })
}

fn input(title: &str) -> PostInput {
    PostInput {
        title: title.to_string(),
        content: "content".to_string(),
        visible: true,
        ..PostInput::default()
    }
}

#[tokio::test]
async fn test_last_modified_never_precedes_creation() {
    let (blog, _store, clock) = setup().await;
    let alice = author("alice");

    let post = blog.create_post(&alice, input("Draft")).await.unwrap();
    assert_eq!(post.created_at, post.last_modified);

    clock.advance(Duration::hours(2));
    let later = blog
        .edit_post(&alice, PostId::new(post.id), input("Later"))
        .await
        .unwrap();
    assert_eq!(later.created_at, post.created_at);
    assert_eq!(later.last_modified, post.created_at + Duration::hours(2));

    // A clock that jumped backwards still yields a consistent pair.
    clock.set(post.created_at - Duration::days(1));
    let skewed = blog
        .edit_post(&alice, PostId::new(post.id), input("Skewed"))
        .await
        .unwrap();
    assert!(skewed.created_at <= skewed.last_modified);
}

#[tokio::test]
async fn test_mutations_require_owner() {
    let (blog, store, _clock) = setup().await;
    let post = blog.create_post(&author("alice"), input("Mine")).await.unwrap();
    let id = PostId::new(post.id);

    assert!(matches!(
        blog.edit_post(&Actor::Anonymous, id, input("x")).await,
        Err(BlogError::LoginRequired)
    ));
    assert!(matches!(
        blog.delete_post(&author("bob"), id).await,
        Err(BlogError::Forbidden(_))
    ));
    assert!(matches!(
        blog.create_post(&Actor::Anonymous, input("x")).await,
        Err(BlogError::LoginRequired)
    ));
    assert!(matches!(
        blog.delete_post(&author("alice"), PostId::new(post.id + 1)).await,
        Err(BlogError::PostNotFound(_))
    ));

    assert_eq!(store.get_post(post.id).await.unwrap().unwrap().title, "Mine");
}

#[tokio::test]
async fn test_comments_follow_their_post() {
    let (blog, store, clock) = setup().await;
    let alice = author("alice");
    let post = blog.create_post(&alice, input("Thread")).await.unwrap();
    let id = PostId::new(post.id);

    for (i, body) in ["first", "second"].into_iter().enumerate() {
        clock.advance(Duration::minutes(i64::try_from(i).unwrap() + 1));
        blog.add_comment(
            &Actor::Anonymous,
            id,
            CommentInput {
                author: "Visitor".to_string(),
                body: body.to_string(),
            },
        )
        .await
        .unwrap();
    }

    let detail = blog.get_post(&Actor::Anonymous, id).await.unwrap();
    let bodies: Vec<_> = detail.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(bodies, vec!["first", "second"]);
    assert!(!detail.can_edit);

    blog.delete_post(&alice, id).await.unwrap();
    assert_eq!(store.count_comments(post.id).await.unwrap(), 0);
    assert!(matches!(
        blog.get_post(&Actor::Anonymous, id).await,
        Err(BlogError::PostNotFound(_))
    ));
}

#[tokio::test]
async fn test_hidden_posts_stay_out_of_listings() {
    let (blog, _store, clock) = setup().await;
    let alice = author("alice");

    blog.create_post(&alice, input("Public")).await.unwrap();
    clock.advance(Duration::minutes(1));
    let mut hidden = input("Secret");
    hidden.visible = false;
    hidden.new_tags = vec!["private".to_string()];
    let hidden = blog.create_post(&alice, hidden).await.unwrap();

    let listed: Vec<_> = blog
        .list_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(listed, vec!["Public"]);
    assert!(blog.list_by_tag("private").await.unwrap().is_empty());
    assert!(blog.search("secret").await.unwrap().is_empty());

    assert!(matches!(
        blog.get_post(&author("bob"), PostId::new(hidden.id)).await,
        Err(BlogError::PostNotFound(_))
    ));
    assert!(blog.get_post(&alice, PostId::new(hidden.id)).await.unwrap().can_edit);
}

#[tokio::test]
async fn test_password_check_treats_unknown_and_wrong_alike() {
    let (_blog, store, _clock) = setup().await;
    let security = common::test_config().security;
    store
        .create_user(
            &NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: common::PASSWORD.to_string(),
                is_active: true,
                is_superuser: false,
            },
            &security,
            Utc::now(),
        )
        .await
        .unwrap();

    assert!(
        store
            .verify_user_password("ghost", common::PASSWORD, &security)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .verify_user_password("alice", "wrong-password", &security)
            .await
            .unwrap()
            .is_none()
    );
    let user = store
        .verify_user_password("alice", common::PASSWORD, &security)
        .await
        .unwrap();
    assert_eq!(user.map(|u| u.username).as_deref(), Some("alice"));
}
