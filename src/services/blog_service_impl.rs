//! `SeaORM` implementation of the `BlogService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Store;
use crate::domain::{Actor, PostId, can_mutate};
use crate::forms::FormErrors;
use crate::models::{Comment, CommentInput, Post, PostInput, Tag};
use crate::services::blog_service::{BlogError, BlogService, PostDetail};
use crate::services::clock::Clock;

pub struct SeaOrmBlogService {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl SeaOrmBlogService {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    async fn load(&self, id: PostId) -> Result<Post, BlogError> {
        self.store
            .get_post(id.value())
            .await?
            .ok_or(BlogError::PostNotFound(id))
    }

    /// Hidden posts only exist for actors allowed to modify them.
    async fn load_visible_to(&self, actor: &Actor, id: PostId) -> Result<Post, BlogError> {
        let post = self.load(id).await?;
        if post.visible || can_mutate(actor, &post) {
            Ok(post)
        } else {
            Err(BlogError::PostNotFound(id))
        }
    }

    async fn load_mutable(&self, actor: &Actor, id: PostId) -> Result<Post, BlogError> {
        let Some(user) = actor.user() else {
            return Err(BlogError::LoginRequired);
        };

        let post = self.load(id).await?;
        if !can_mutate(actor, &post) {
            warn!(
                event = "post_mutation_denied",
                post_id = id.value(),
                user = %user.username,
                author = %post.author,
                "User may not modify post"
            );
            return Err(BlogError::Forbidden(id));
        }
        Ok(post)
    }

    async fn check_tags(&self, input: &PostInput) -> Result<(), BlogError> {
        let missing = self.store.missing_tag_ids(&input.tag_ids).await?;
        if missing.is_empty() {
            return Ok(());
        }

        let mut errors = FormErrors::new();
        for id in missing {
            errors.add(
                "tags",
                format!("Select a valid choice. {id} is not one of the available choices."),
            );
        }
        Err(BlogError::Validation(errors))
    }
}

#[async_trait]
impl BlogService for SeaOrmBlogService {
    async fn list_posts(&self) -> Result<Vec<Post>, BlogError> {
        Ok(self.store.list_visible_posts().await?)
    }

    async fn list_by_tag(&self, tag: &str) -> Result<Vec<Post>, BlogError> {
        Ok(self.store.list_visible_posts_by_tag(tag.trim()).await?)
    }

    async fn search(&self, query: &str) -> Result<Vec<Post>, BlogError> {
        Ok(self.store.search_visible_posts(query.trim()).await?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, BlogError> {
        Ok(self.store.list_tags().await?)
    }

    async fn get_post(&self, actor: &Actor, id: PostId) -> Result<PostDetail, BlogError> {
        let post = self.load_visible_to(actor, id).await?;
        let comments = self.store.list_comments(post.id).await?;
        let can_edit = can_mutate(actor, &post);

        Ok(PostDetail {
            post,
            comments,
            can_edit,
        })
    }

    async fn add_comment(
        &self,
        actor: &Actor,
        id: PostId,
        input: CommentInput,
    ) -> Result<Comment, BlogError> {
        let post = self.load_visible_to(actor, id).await?;
        let comment = self
            .store
            .add_comment(post.id, &input, self.clock.now())
            .await?;

        info!(
            event = "comment_added",
            post_id = post.id,
            comment_id = comment.id,
            "Comment added"
        );
        Ok(comment)
    }

    async fn post_for_edit(&self, actor: &Actor, id: PostId) -> Result<Post, BlogError> {
        self.load_mutable(actor, id).await
    }

    async fn create_post(&self, actor: &Actor, input: PostInput) -> Result<Post, BlogError> {
        let Some(user) = actor.user() else {
            return Err(BlogError::LoginRequired);
        };

        self.check_tags(&input).await?;

        let post = self
            .store
            .create_post(&input, &user.username, self.clock.now())
            .await?;

        info!(
            event = "post_created",
            post_id = post.id,
            author = %post.author,
            tags = post.tags.len(),
            "Post created"
        );
        Ok(post)
    }

    async fn edit_post(
        &self,
        actor: &Actor,
        id: PostId,
        input: PostInput,
    ) -> Result<Post, BlogError> {
        self.load_mutable(actor, id).await?;
        self.check_tags(&input).await?;

        let post = self
            .store
            .update_post(id.value(), &input, self.clock.now())
            .await?
            .ok_or(BlogError::PostNotFound(id))?;

        info!(
            event = "post_edited",
            post_id = post.id,
            editor = actor.user().map(|u| u.username.as_str()).unwrap_or_default(),
            "Post edited"
        );
        Ok(post)
    }

    async fn delete_post(&self, actor: &Actor, id: PostId) -> Result<(), BlogError> {
        self.load_mutable(actor, id).await?;

        if !self.store.delete_post(id.value()).await? {
            return Err(BlogError::PostNotFound(id));
        }

        info!(event = "post_deleted", post_id = id.value(), "Post deleted");
        Ok(())
    }
}
