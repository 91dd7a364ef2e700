use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::AuthUser;
use crate::forms::{
    CommentForm, FormErrors, LoginForm, PasswordResetForm, PostForm, ProfileForm, SignUpForm,
};
use crate::models::{Comment, Post, Tag};

/// A rendered page: the template to fill and the values to fill it with.
#[derive(Debug, Serialize)]
pub struct View<T> {
    pub template: &'static str,
    pub context: T,
}

impl<T: Serialize> View<T> {
    pub const fn new(template: &'static str, context: T) -> Self {
        Self { template, context }
    }
}

impl<T: Serialize> IntoResponse for View<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[derive(Debug, Serialize)]
pub struct PostListContext {
    pub user: Option<AuthUser>,
    pub posts: Vec<Post>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub user: Option<AuthUser>,
    pub post: Post,
    pub comments: Vec<Comment>,
    pub can_edit: bool,
    pub form: CommentForm,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct PostFormContext {
    pub user: Option<AuthUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i32>,
    pub form: PostForm,
    pub errors: FormErrors,
    /// Tags offered as checkboxes.
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub struct RegisterContext {
    pub form: SignUpForm,
    pub errors: FormErrors,
    pub captcha_site_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginContext {
    pub form: LoginForm,
    pub errors: FormErrors,
    pub captcha_site_key: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileContext {
    pub user: Option<AuthUser>,
    pub form: ProfileForm,
    pub date_joined: DateTime<Utc>,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetContext {
    pub form: PasswordResetForm,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetConfirmContext {
    pub validlink: bool,
    pub errors: FormErrors,
}

#[derive(Debug, Default, Serialize)]
pub struct PageContext {
    pub user: Option<AuthUser>,
}

#[derive(Debug, Serialize)]
pub struct ErrorContext {
    pub message: String,
}
