//! Domain service for posts, tags and comments.
//!
//! Owns the visibility rules for listings and the authorization checks for
//! editing and deleting posts.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, PostId};
use crate::forms::FormErrors;
use crate::models::{Comment, CommentInput, Post, PostInput, Tag};

/// Errors specific to blog operations.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    #[error("Not allowed to modify post {0}")]
    Forbidden(PostId),

    #[error("Login required")]
    LoginRequired,

    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for BlogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for BlogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A post together with what the detail page shows around it.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    /// Whether the requesting actor may edit or delete the post.
    pub can_edit: bool,
}

/// Domain service trait for the blog.
#[async_trait::async_trait]
pub trait BlogService: Send + Sync {
    /// Visible posts, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, BlogError>;

    /// Visible posts with a tag whose name contains `tag`, ignoring case.
    async fn list_by_tag(&self, tag: &str) -> Result<Vec<Post>, BlogError>;

    /// Case-insensitive substring search over title, short description,
    /// content and tag names. An empty query returns the same list as
    /// [`BlogService::list_posts`].
    async fn search(&self, query: &str) -> Result<Vec<Post>, BlogError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, BlogError>;

    /// Loads a post with its comments.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::PostNotFound`] when the post does not exist, or is
    /// hidden and the actor may not modify it.
    async fn get_post(&self, actor: &Actor, id: PostId) -> Result<PostDetail, BlogError>;

    /// Adds a comment; no authentication is involved.
    async fn add_comment(
        &self,
        actor: &Actor,
        id: PostId,
        input: CommentInput,
    ) -> Result<Comment, BlogError>;

    /// Loads a post for the edit form, checking the actor may modify it.
    async fn post_for_edit(&self, actor: &Actor, id: PostId) -> Result<Post, BlogError>;

    /// Creates a post authored by the acting user.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::LoginRequired`] for anonymous actors and
    /// [`BlogError::Validation`] when a selected tag does not exist.
    async fn create_post(&self, actor: &Actor, input: PostInput) -> Result<Post, BlogError>;

    /// Replaces the editable fields and tag set of a post.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::Forbidden`] unless the actor is the author or a
    /// superuser; nothing is written in that case.
    async fn edit_post(&self, actor: &Actor, id: PostId, input: PostInput)
    -> Result<Post, BlogError>;

    /// Deletes a post and, with it, its comments.
    async fn delete_post(&self, actor: &Actor, id: PostId) -> Result<(), BlogError>;
}
