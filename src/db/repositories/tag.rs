use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::tags;
use crate::models::Tag;

impl From<tags::Model> for Tag {
    fn from(model: tags::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

pub struct TagRepository {
    conn: DatabaseConnection,
}

impl TagRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        let tags = tags::Entity::find()
            .order_by_asc(tags::Column::NameKey)
            .all(&self.conn)
            .await?;

        Ok(tags.into_iter().map(Tag::from).collect())
    }

    /// Ids from `ids` that do not name an existing tag.
    pub async fn missing_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<i32> = tags::Entity::find()
            .filter(tags::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    pub async fn get_or_create(&self, name: &str) -> Result<Tag> {
        get_or_create(&self.conn, name).await.map(Tag::from)
    }
}

/// Looks a tag up by name, ignoring case, and inserts it when missing.
pub(crate) async fn get_or_create<C: ConnectionTrait>(db: &C, name: &str) -> Result<tags::Model> {
    let key = name.to_lowercase();

    if let Some(existing) = tags::Entity::find()
        .filter(tags::Column::NameKey.eq(key.as_str()))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let created = tags::ActiveModel {
        name: Set(name.to_string()),
        name_key: Set(key),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(created)
}
