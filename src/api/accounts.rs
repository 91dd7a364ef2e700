use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::start_session;
use super::types::{PageContext, ProfileContext, RegisterContext, View, found};
use super::{ApiError, AppState};
use crate::domain::Actor;
use crate::forms::{FormErrors, ProfileForm, SignUpForm};
use crate::services::AuthError;

fn register_view(state: &AppState, form: SignUpForm, errors: FormErrors) -> View<RegisterContext> {
    View::new(
        "blog/register.html",
        RegisterContext {
            form,
            errors,
            captcha_site_key: state.captcha_site_key(),
        },
    )
}

/// GET /register/
pub async fn register_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    register_view(&state, SignUpForm::default(), FormErrors::new())
}

/// POST /register/
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SignUpForm>,
) -> Result<Response, ApiError> {
    match state.auth().register(&form).await {
        Ok(_) => Ok(found("/check-email/")),
        Err(AuthError::Validation(errors)) => Ok(register_view(&state, form, errors).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET /check-email/
pub async fn check_email() -> impl IntoResponse {
    View::new("blog/check_email.html", PageContext::default())
}

/// GET /activate/{uid}/{token}/
///
/// Every failure renders the same page so the link reveals nothing about the
/// account behind it.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((uidb64, token)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    match state.auth().activate(&uidb64, &token).await {
        Ok(user) => {
            start_session(&session, &user).await?;
            Ok(found("/success/"))
        }
        Err(AuthError::InvalidLink) => {
            Ok(View::new("blog/activate_invalid.html", PageContext::default()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /success/
pub async fn success(Extension(actor): Extension<Actor>) -> impl IntoResponse {
    View::new(
        "blog/success.html",
        PageContext {
            user: actor.user().cloned(),
        },
    )
}

async fn profile_view(
    state: &AppState,
    actor: &Actor,
    form: Option<ProfileForm>,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    let Some(current) = actor.user() else {
        return Err(ApiError::Redirect(super::auth::LOGIN_URL.to_string()));
    };
    let user = state.auth().get_user(current.id).await?;
    let form = form.unwrap_or_else(|| ProfileForm {
        username: user.username.clone(),
        email: user.email.clone(),
    });

    Ok(View::new(
        "blog/profile.html",
        ProfileContext {
            user: actor.user().cloned(),
            form,
            date_joined: user.date_joined,
            errors,
        },
    )
    .into_response())
}

/// GET /profile/
pub async fn profile_page(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Response, ApiError> {
    profile_view(&state, &actor, None, FormErrors::new()).await
}

/// POST /profile/
///
/// `date_joined` is display-only; a submitted value is ignored.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    let Some(current) = actor.user() else {
        return Err(ApiError::Redirect(super::auth::LOGIN_URL.to_string()));
    };

    match state.auth().update_profile(current.id, &form).await {
        Ok(_) => Ok(found("/")),
        Err(AuthError::Validation(errors)) => profile_view(&state, &actor, Some(form), errors).await,
        Err(e) => Err(e.into()),
    }
}
