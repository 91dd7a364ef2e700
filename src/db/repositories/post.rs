use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, IntoColumnRef, LikeExpr, Query, SelectStatement, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};

use super::tag::get_or_create;
use crate::entities::{comments, post_tags, posts, tags};
use crate::models::{Post, PostInput, Tag};

fn map_post(model: posts::Model, mut tag_models: Vec<tags::Model>) -> Post {
    tag_models.sort_by(|a, b| a.name_key.cmp(&b.name_key));
    Post {
        id: model.id,
        title: model.title,
        short_description: model.short_description,
        content: model.content,
        featured_image_url: model.featured_image_url,
        created_at: model.created_at,
        last_modified: model.last_modified,
        visible: model.visible,
        author: model.author,
        tags: tag_models.into_iter().map(Tag::from).collect(),
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `column` must hold text already folded with `str::to_lowercase`.
fn contains_folded<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    Expr::col(column).like(LikeExpr::new(like_pattern(needle)).escape('\\'))
}

/// Lowercased text the search filter runs against.
fn search_text(input: &PostInput) -> String {
    [
        input.title.as_str(),
        input.short_description.as_deref().unwrap_or_default(),
        input.content.as_str(),
    ]
    .join("\n")
    .to_lowercase()
}

/// Ids of posts carrying a tag whose name contains `needle`.
fn posts_tagged_like(needle: &str) -> SelectStatement {
    Query::select()
        .column((post_tags::Entity, post_tags::Column::PostId))
        .from(post_tags::Entity)
        .inner_join(
            tags::Entity,
            Expr::col((tags::Entity, tags::Column::Id))
                .equals((post_tags::Entity, post_tags::Column::TagId)),
        )
        .and_where(contains_folded((tags::Entity, tags::Column::NameKey), needle))
        .to_owned()
}

fn newest_first(select: Select<posts::Entity>) -> Select<posts::Entity> {
    select
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
}

pub struct PostRepository {
    conn: DatabaseConnection,
}

impl PostRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn with_tags(&self, models: Vec<posts::Model>) -> Result<Vec<Post>> {
        let tag_sets = models
            .load_many_to_many(tags::Entity, post_tags::Entity, &self.conn)
            .await?;

        Ok(models
            .into_iter()
            .zip(tag_sets)
            .map(|(model, tags)| map_post(model, tags))
            .collect())
    }

    /// Visible posts, newest first.
    pub async fn list_visible(&self) -> Result<Vec<Post>> {
        let models = newest_first(posts::Entity::find().filter(posts::Column::Visible.eq(true)))
            .all(&self.conn)
            .await?;
        self.with_tags(models).await
    }

    /// Visible posts with a tag whose name contains `tag`, ignoring case.
    pub async fn list_visible_by_tag(&self, tag: &str) -> Result<Vec<Post>> {
        let models = newest_first(
            posts::Entity::find()
                .filter(posts::Column::Visible.eq(true))
                .filter(posts::Column::Id.in_subquery(posts_tagged_like(tag))),
        )
        .all(&self.conn)
        .await?;
        self.with_tags(models).await
    }

    /// Visible posts whose title, short description, content or any tag name
    /// contains `query`, ignoring case. A blank query matches every post.
    pub async fn search_visible(&self, query: &str) -> Result<Vec<Post>> {
        let mut select = posts::Entity::find().filter(posts::Column::Visible.eq(true));

        if !query.is_empty() {
            select = select.filter(
                Condition::any()
                    .add(contains_folded(
                        (posts::Entity, posts::Column::SearchText),
                        query,
                    ))
                    .add(posts::Column::Id.in_subquery(posts_tagged_like(query))),
            );
        }

        let models = newest_first(select).all(&self.conn).await?;
        self.with_tags(models).await
    }

    pub async fn get(&self, id: i32) -> Result<Option<Post>> {
        let Some(model) = posts::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let tags = model.find_related(tags::Entity).all(&self.conn).await?;
        Ok(Some(map_post(model, tags)))
    }

    pub async fn create(&self, input: &PostInput, author: &str, now: DateTime<Utc>) -> Result<Post> {
        let txn = self.conn.begin().await?;

        let tag_ids = resolve_tags(&txn, input).await?;

        let model = posts::ActiveModel {
            title: Set(input.title.clone()),
            short_description: Set(input.short_description.clone()),
            content: Set(input.content.clone()),
            featured_image_url: Set(input.featured_image_url.clone()),
            created_at: Set(now),
            last_modified: Set(now),
            visible: Set(input.visible),
            author: Set(author.to_string()),
            search_text: Set(search_text(input)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        link_tags(&txn, model.id, &tag_ids).await?;

        txn.commit().await?;

        self.get(model.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created post"))
    }

    /// Rewrites the editable fields and replaces the tag set.
    /// `author` and `created_at` are left as they are.
    pub async fn update(&self, id: i32, input: &PostInput, now: DateTime<Utc>) -> Result<Option<Post>> {
        let txn = self.conn.begin().await?;

        let Some(existing) = posts::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let last_modified = now.max(existing.created_at);
        let tag_ids = resolve_tags(&txn, input).await?;

        let mut active: posts::ActiveModel = existing.into();
        active.title = Set(input.title.clone());
        active.short_description = Set(input.short_description.clone());
        active.content = Set(input.content.clone());
        active.featured_image_url = Set(input.featured_image_url.clone());
        active.visible = Set(input.visible);
        active.last_modified = Set(last_modified);
        active.search_text = Set(search_text(input));
        active.update(&txn).await?;

        post_tags::Entity::delete_many()
            .filter(post_tags::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        link_tags(&txn, id, &tag_ids).await?;

        txn.commit().await?;
        self.get(id).await
    }

    /// Deletes the post together with its comments and tag links.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        comments::Entity::delete_many()
            .filter(comments::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        post_tags::Entity::delete_many()
            .filter(post_tags::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        let result = posts::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

/// Selected tag ids followed by the ids of the named tags, created on demand.
async fn resolve_tags<C: ConnectionTrait>(db: &C, input: &PostInput) -> Result<Vec<i32>> {
    let mut ids = input.tag_ids.clone();
    for name in &input.new_tags {
        let tag = get_or_create(db, name).await?;
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }
    Ok(ids)
}

async fn link_tags<C: ConnectionTrait>(db: &C, post_id: i32, tag_ids: &[i32]) -> Result<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let links = tag_ids.iter().map(|&tag_id| post_tags::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(tag_id),
    });
    post_tags::Entity::insert_many(links).exec(db).await?;
    Ok(())
}
