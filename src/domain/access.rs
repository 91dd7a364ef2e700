//! Who may change a post.

use serde::Serialize;

use crate::models::{Post, User};

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub is_superuser: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
        }
    }
}

/// The identity performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(AuthUser),
}

impl Actor {
    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl From<Option<AuthUser>> for Actor {
    fn from(user: Option<AuthUser>) -> Self {
        user.map_or(Self::Anonymous, Self::User)
    }
}

/// Edit and delete are allowed for the post's author and for superusers.
///
/// The comparison is between the actor's username and the stored author name.
#[must_use]
pub fn can_mutate(actor: &Actor, post: &Post) -> bool {
    actor
        .user()
        .is_some_and(|user| user.is_superuser || user.username == post.author)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn post_by(author: &str) -> Post {
        let now = Utc::now();
        Post {
            id: 1,
            title: "Title".to_string(),
            short_description: None,
            content: "<p>Body</p>".to_string(),
            featured_image_url: None,
            created_at: now,
            last_modified: now,
            visible: true,
            author: author.to_string(),
            tags: Vec::new(),
        }
    }

    fn user(username: &str, is_superuser: bool) -> Actor {
        Actor::User(AuthUser {
            id: 1,
            username: username.to_string(),
            is_superuser,
        })
    }

    #[test]
    fn author_may_mutate_own_post() {
        assert!(can_mutate(&user("bob", false), &post_by("bob")));
    }

    #[test]
    fn other_user_may_not_mutate() {
        assert!(!can_mutate(&user("carol", false), &post_by("bob")));
    }

    #[test]
    fn superuser_may_mutate_any_post() {
        assert!(can_mutate(&user("root", true), &post_by("bob")));
    }

    #[test]
    fn anonymous_never_mutates() {
        assert!(!can_mutate(&Actor::Anonymous, &post_by("bob")));
        assert!(!can_mutate(&Actor::Anonymous, &post_by("")));
    }

    #[test]
    fn username_match_is_exact() {
        assert!(!can_mutate(&user("Bob", false), &post_by("bob")));
        assert!(!can_mutate(&user("bob ", false), &post_by("bob")));
    }

    proptest! {
        #[test]
        fn can_mutate_iff_author_or_superuser(
            username in "[a-z]{1,8}",
            author in "[a-z]{1,8}",
            is_superuser in any::<bool>(),
        ) {
            let actor = user(&username, is_superuser);
            let post = post_by(&author);
            prop_assert_eq!(can_mutate(&actor, &post), is_superuser || username == author);
        }

        #[test]
        fn anonymous_is_always_denied(author in ".{0,16}") {
            prop_assert!(!can_mutate(&Actor::Anonymous, &post_by(&author)));
        }
    }
}
