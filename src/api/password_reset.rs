use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::types::{PageContext, PasswordResetConfirmContext, PasswordResetContext, View, found};
use super::{ApiError, AppState};
use crate::forms::{FormErrors, PasswordResetForm, SetPasswordForm};
use crate::services::AuthError;

fn request_view(form: PasswordResetForm, errors: FormErrors) -> View<PasswordResetContext> {
    View::new(
        "blog/password_reset.html",
        PasswordResetContext { form, errors },
    )
}

fn confirm_view(validlink: bool, errors: FormErrors) -> View<PasswordResetConfirmContext> {
    View::new(
        "blog/password_reset_confirm.html",
        PasswordResetConfirmContext { validlink, errors },
    )
}

/// GET /password-reset/
pub async fn request_page() -> impl IntoResponse {
    request_view(PasswordResetForm::default(), FormErrors::new())
}

/// POST /password-reset/
///
/// Answers the same way whether or not the address belongs to an account.
pub async fn request(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PasswordResetForm>,
) -> Result<Response, ApiError> {
    match state.auth().request_password_reset(&form).await {
        Ok(()) => Ok(found("/password-reset/done/")),
        Err(AuthError::Validation(errors)) => Ok(request_view(form, errors).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET /password-reset/done/
pub async fn done() -> impl IntoResponse {
    View::new("blog/password_reset_done.html", PageContext::default())
}

/// GET /password-reset-confirm/{uid}/{token}/
pub async fn confirm_page(
    State(state): State<Arc<AppState>>,
    Path((uidb64, token)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    match state.auth().check_reset_link(&uidb64, &token).await {
        Ok(_) => Ok(confirm_view(true, FormErrors::new()).into_response()),
        Err(AuthError::InvalidLink) => Ok(confirm_view(false, FormErrors::new()).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// POST /password-reset-confirm/{uid}/{token}/
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path((uidb64, token)): Path<(String, String)>,
    Form(form): Form<SetPasswordForm>,
) -> Result<Response, ApiError> {
    match state
        .auth()
        .confirm_password_reset(&uidb64, &token, &form)
        .await
    {
        Ok(_) => Ok(found("/password-reset-complete/")),
        Err(AuthError::Validation(errors)) => Ok(confirm_view(true, errors).into_response()),
        Err(AuthError::InvalidLink) => Ok(confirm_view(false, FormErrors::new()).into_response()),
        Err(e) => Err(e.into()),
    }
}

/// GET /password-reset-complete/
pub async fn complete() -> impl IntoResponse {
    View::new("blog/password_reset_complete.html", PageContext::default())
}
