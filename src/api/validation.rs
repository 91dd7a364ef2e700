use super::ApiError;
use crate::domain::PostId;

/// Parses the `{id}` path segment of post routes. Anything that is not a
/// positive integer names no post.
pub fn parse_post_id(raw: &str) -> Result<PostId, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(PostId::new(id)),
        _ => Err(ApiError::not_found("Post", raw)),
    }
}

/// Only same-site paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}
