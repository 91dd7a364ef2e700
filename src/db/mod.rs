use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::{Comment, CommentInput, NewUser, Post, PostInput, Tag, User};

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn post_repo(&self) -> repositories::post::PostRepository {
        repositories::post::PostRepository::new(self.conn.clone())
    }

    fn tag_repo(&self) -> repositories::tag::TagRepository {
        repositories::tag::TagRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Posts ==========

    pub async fn list_visible_posts(&self) -> Result<Vec<Post>> {
        self.post_repo().list_visible().await
    }

    pub async fn list_visible_posts_by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        self.post_repo().list_visible_by_tag(tag).await
    }

    pub async fn search_visible_posts(&self, query: &str) -> Result<Vec<Post>> {
        self.post_repo().search_visible(query).await
    }

    pub async fn get_post(&self, id: i32) -> Result<Option<Post>> {
        self.post_repo().get(id).await
    }

    pub async fn create_post(
        &self,
        input: &PostInput,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<Post> {
        self.post_repo().create(input, author, now).await
    }

    pub async fn update_post(
        &self,
        id: i32,
        input: &PostInput,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>> {
        self.post_repo().update(id, input, now).await
    }

    pub async fn delete_post(&self, id: i32) -> Result<bool> {
        self.post_repo().delete(id).await
    }

    // ========== Tags ==========

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.tag_repo().list().await
    }

    pub async fn missing_tag_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        self.tag_repo().missing_ids(ids).await
    }

    pub async fn get_or_create_tag(&self, name: &str) -> Result<Tag> {
        self.tag_repo().get_or_create(name).await
    }

    // ========== Comments ==========

    pub async fn list_comments(&self, post_id: i32) -> Result<Vec<Comment>> {
        self.comment_repo().list_for_post(post_id).await
    }

    pub async fn count_comments(&self, post_id: i32) -> Result<u64> {
        self.comment_repo().count_for_post(post_id).await
    }

    pub async fn add_comment(
        &self,
        post_id: i32,
        input: &CommentInput,
        now: DateTime<Utc>,
    ) -> Result<Comment> {
        self.comment_repo().add(post_id, input, now).await
    }

    // ========== Users ==========

    pub async fn create_user(
        &self,
        new_user: &NewUser,
        config: &SecurityConfig,
        now: DateTime<Utc>,
    ) -> Result<User> {
        self.user_repo().create(new_user, config, now).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_active_users_by_email(&self, email: &str) -> Result<Vec<User>> {
        self.user_repo().list_active_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn username_taken(&self, username: &str, except_id: Option<i32>) -> Result<bool> {
        self.user_repo().username_taken(username, except_id).await
    }

    pub async fn email_taken(&self, email: &str, except_id: Option<i32>) -> Result<bool> {
        self.user_repo().email_taken(email, except_id).await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password, config).await
    }

    pub async fn set_user_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo().set_password(id, new_password, config).await
    }

    pub async fn activate_user(&self, id: i32, now: DateTime<Utc>) -> Result<User> {
        self.user_repo().activate(id, now).await
    }

    pub async fn touch_last_login(&self, id: i32, now: DateTime<Utc>) -> Result<User> {
        self.user_repo().touch_last_login(id, now).await
    }

    pub async fn update_user_profile(&self, id: i32, username: &str, email: &str) -> Result<User> {
        self.user_repo().update_profile(id, username, email).await
    }

    pub async fn set_user_superuser(&self, id: i32, is_superuser: bool) -> Result<User> {
        self.user_repo().set_superuser(id, is_superuser).await
    }
}
