pub mod post;
pub mod user;

pub use post::{Comment, CommentInput, Post, PostInput, Tag};
pub use user::{NewUser, User};
