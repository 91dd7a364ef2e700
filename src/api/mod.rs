use axum::{
    Router, middleware,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

mod accounts;
pub mod auth;
mod error;
mod observability;
mod password_reset;
mod posts;
pub mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{AuthService, BlogService};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        self.shared.config()
    }

    #[must_use]
    pub fn blog(&self) -> &Arc<dyn BlogService> {
        &self.shared.blog_service
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    /// Site key for the challenge widget, when the challenge is on.
    #[must_use]
    pub fn captcha_site_key(&self) -> Option<String> {
        self.shared.captcha.site_key().map(ToString::to_string)
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name("folio_session")
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )));

    let login_required = Router::new()
        .route("/addpost/", get(posts::add_page).post(posts::add))
        .route("/editpost/{id}/", get(posts::edit_page).post(posts::edit))
        .route("/deletepost/{id}/", post(posts::delete))
        .route(
            "/profile/",
            get(accounts::profile_page).post(accounts::update_profile),
        )
        .route_layer(middleware::from_fn(auth::require_login));

    Router::new()
        .route("/", get(posts::index))
        .route("/tag/{name}/", get(posts::by_tag))
        .route("/post/{id}/", get(posts::detail).post(posts::comment))
        .route("/search/", get(posts::search))
        .route(
            "/register/",
            get(accounts::register_page).post(accounts::register),
        )
        .route("/check-email/", get(accounts::check_email))
        .route("/activate/{uid}/{token}/", get(accounts::activate))
        .route("/success/", get(accounts::success))
        .route("/accounts/login/", get(auth::login_page).post(auth::login))
        .route("/accounts/logout/", get(auth::logout).post(auth::logout))
        .route(
            "/password-reset/",
            get(password_reset::request_page).post(password_reset::request),
        )
        .route("/password-reset/done/", get(password_reset::done))
        .route(
            "/password-reset-confirm/{uid}/{token}/",
            get(password_reset::confirm_page).post(password_reset::confirm),
        )
        .route(
            "/password-reset-complete/",
            get(password_reset::complete),
        )
        .merge(login_required)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::actor_middleware,
        ))
        .route_layer(middleware::from_fn(observability::logging_middleware))
        .route("/metrics", get(observability::get_metrics))
        .fallback(not_found)
        .layer(session_layer)
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    ApiError::NotFound("Page not found".to_string())
}
