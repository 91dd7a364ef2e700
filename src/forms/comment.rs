use serde::{Deserialize, Serialize};

use super::{FormErrors, required_text};
use crate::models::CommentInput;

pub const AUTHOR_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    pub author: String,
    pub body: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<CommentInput, FormErrors> {
        let mut errors = FormErrors::new();
        let author = required_text(&mut errors, "author", &self.author, Some(AUTHOR_MAX_LENGTH));
        let body = required_text(&mut errors, "body", &self.body, None);
        errors.into_result(CommentInput { author, body })
    }
}
