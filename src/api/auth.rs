use axum::{
    Extension, Form,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::types::{LoginContext, View, found};
use super::validation::safe_next;
use super::{ApiError, AppState};
use crate::domain::{Actor, AuthUser};
use crate::forms::{FormErrors, LoginForm};
use crate::models::User;
use crate::services::AuthError;

pub const LOGIN_URL: &str = "/accounts/login/";

/// Session key holding the authenticated user's id.
const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the session to an [`Actor`] and stores it in the request
/// extensions. Sessions pointing at a removed or deactivated account are
/// treated as anonymous.
pub async fn actor_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = session
        .get::<i32>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    let actor = match user_id {
        Some(id) => match state.auth().session_user(id).await? {
            Some(user) => {
                let span = tracing::Span::current();
                span.record("user_id", user.id);
                span.record("username", user.username.as_str());
                Actor::User(AuthUser::from(&user))
            }
            None => Actor::Anonymous,
        },
        None => Actor::Anonymous,
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Sends anonymous visitors to the login page, remembering where they were
/// going.
pub async fn require_login(
    Extension(actor): Extension<Actor>,
    request: Request,
    next: Next,
) -> Response {
    if actor.is_authenticated() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());
    found(&login_redirect(&target))
}

#[must_use]
pub fn login_redirect(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", urlencoding::encode(next))
}

// ============================================================================
// Session helpers
// ============================================================================

/// Binds the session to `user`, issuing a fresh session id.
pub async fn start_session(session: &Session, user: &User) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to cycle session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn login_view(state: &AppState, form: LoginForm, errors: FormErrors) -> View<LoginContext> {
    let next = form.next.clone();
    View::new(
        "blog/login.html",
        LoginContext {
            form,
            errors,
            captcha_site_key: state.captcha_site_key(),
            next,
        },
    )
}

/// GET /accounts/login/
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    login_view(&state, form, FormErrors::new())
}

/// POST /accounts/login/
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(mut form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if form.next.is_none() {
        form.next = query.next;
    }

    match state.auth().login(&form).await {
        Ok(user) => {
            start_session(&session, &user).await?;
            let target = safe_next(form.next.as_deref()).unwrap_or("/");
            Ok(found(target))
        }
        Err(AuthError::Validation(errors)) => Ok(login_view(&state, form, errors).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET|POST /accounts/logout/
pub async fn logout(session: Session) -> Result<Response, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
    Ok(found("/"))
}
