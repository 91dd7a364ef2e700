use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub short_description: Option<String>,
    pub content: String,
    pub featured_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub visible: bool,
    pub author: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Cleaned post fields, shared by the create and edit flows.
///
/// `tag_ids` reference existing tags; `new_tags` are names that are looked up
/// case-insensitively and created when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub short_description: Option<String>,
    pub content: String,
    pub featured_image_url: Option<String>,
    pub visible: bool,
    pub tag_ids: Vec<i32>,
    pub new_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    pub author: String,
    pub body: String,
}
