use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::comments;
use crate::models::{Comment, CommentInput};

impl From<comments::Model> for Comment {
    fn from(model: comments::Model) -> Self {
        Self {
            id: model.id,
            post_id: model.post_id,
            author: model.author,
            content: model.content,
            created_at: model.created_at,
        }
    }
}

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Comments on a post in the order they were written.
    pub async fn list_for_post(&self, post_id: i32) -> Result<Vec<Comment>> {
        let rows = comments::Entity::find()
            .filter(comments::Column::PostId.eq(post_id))
            .order_by_asc(comments::Column::CreatedAt)
            .order_by_asc(comments::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    pub async fn count_for_post(&self, post_id: i32) -> Result<u64> {
        Ok(comments::Entity::find()
            .filter(comments::Column::PostId.eq(post_id))
            .count(&self.conn)
            .await?)
    }

    pub async fn add(&self, post_id: i32, input: &CommentInput, now: DateTime<Utc>) -> Result<Comment> {
        let model = comments::ActiveModel {
            author: Set(input.author.clone()),
            content: Set(input.body.clone()),
            created_at: Set(now),
            post_id: Set(post_id),
            ..Default::default()
        }
        .insert(&self.conn)
        .await?;

        Ok(Comment::from(model))
    }
}
