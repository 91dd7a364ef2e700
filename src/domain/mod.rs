//! Domain types for the blog with strong typing.
//!
//! Identifiers follow the newtype pattern so a post id cannot be passed where a
//! user id is expected. The authorization gate lives in [`access`].

pub mod access;

pub use access::{Actor, AuthUser, can_mutate};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Post.
///
/// # Examples
///
/// ```rust
/// use folio::domain::PostId;
///
/// let id = PostId::new(7);
/// assert_eq!(id.value(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PostId(i32);

impl PostId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "PostId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PostId> for i32 {
    fn from(id: PostId) -> Self {
        id.0
    }
}

impl From<i32> for PostId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for PostId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_id_conversions() {
        let id = PostId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(PostId::from(42), id);
    }

    #[test]
    fn post_id_serialization() {
        let id = PostId::new(3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "3");
        let back: PostId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
