#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use folio::config::Config;
use folio::models::{NewUser, Post, PostInput, User};
use folio::services::{MemoryMailer, SystemClock};
use folio::state::SharedState;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const SITE_URL: &str = "http://testserver";
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub shared: Arc<SharedState>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    let db_file = std::env::temp_dir().join(format!("folio-{}.db", uuid::Uuid::new_v4()));
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_file.display());
    config.general.environment = "test".to_string();
    config.server.site_url = SITE_URL.to_string();
    config.server.secure_cookies = false;
    config.security.secret_key = "test-secret-key-that-is-long-enough-0123456789".to_string();
    config.captcha.testing_bypass = true;
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    let mailer = Arc::new(MemoryMailer::new());
    let shared = Arc::new(
        SharedState::with_components(test_config(), mailer.clone(), Arc::new(SystemClock))
            .await
            .expect("Failed to create shared state"),
    );
    let state = folio::api::create_app_state(shared.clone(), None);
    TestApp {
        router: folio::api::router(state),
        shared,
        mailer,
    }
}

/// URL-encodes `pairs` as a form body.
pub fn form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("folio_session="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(&self, uri: &str, body: String, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    pub async fn create_user(&self, username: &str, email: &str, active: bool) -> User {
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            is_active: active,
            is_superuser: false,
        };
        self.shared
            .store
            .create_user(&new_user, &self.shared.config.security, chrono::Utc::now())
            .await
            .unwrap()
    }

    /// Logs in through the login form and returns the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/accounts/login/",
                form(&[
                    ("username", username),
                    ("password", password),
                    ("g-recaptcha-response", "PASSED"),
                ]),
                None,
            )
            .await;
        assert_eq!(response.status(), 302, "login failed for {username}");
        session_cookie(&response).expect("login sets a session cookie")
    }

    pub async fn create_post(&self, author: &str, title: &str, tags: &[&str], visible: bool) -> Post {
        let input = PostInput {
            title: title.to_string(),
            short_description: None,
            content: format!("Body of {title}"),
            featured_image_url: None,
            visible,
            tag_ids: Vec::new(),
            new_tags: tags.iter().map(ToString::to_string).collect(),
        };
        self.shared
            .store
            .create_post(&input, author, chrono::Utc::now())
            .await
            .unwrap()
    }
}
