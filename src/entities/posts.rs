use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub short_description: Option<String>,

    /// Rich text body, stored as submitted HTML.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub featured_image_url: Option<String>,

    pub created_at: DateTimeUtc,

    pub last_modified: DateTimeUtc,

    pub visible: bool,

    /// Username of the creating user.
    pub author: String,

    /// Title, short description and content folded to lowercase in Rust.
    /// SQLite's `LOWER()` only folds ASCII, so searches match on this instead.
    #[sea_orm(column_type = "Text")]
    pub search_text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::post_tags::Entity")]
    PostTags,
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::post_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PostTags.def()
    }
}

impl Related<super::tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::post_tags::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::post_tags::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
