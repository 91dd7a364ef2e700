//! Domain service for accounts.
//!
//! Handles registration with email activation, login, profile edits and the
//! password reset flow. Sessions are the caller's concern; this service only
//! decides who the user is.

use thiserror::Error;

use crate::forms::{FormErrors, LoginForm, PasswordResetForm, ProfileForm, SetPasswordForm, SignUpForm};
use crate::models::User;
use crate::services::mailer::MailError;

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Account is already active")]
    AlreadyActive,

    /// Activation or reset link that does not verify. Deliberately carries no
    /// detail about which check failed.
    #[error("Invalid or expired link")]
    InvalidLink,

    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for accounts.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an inactive account and mails its activation link.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for invalid input, a failed captcha,
    /// or a username/email that is already registered.
    async fn register(&self, form: &SignUpForm) -> Result<User, AuthError>;

    /// Mails a fresh activation link to an account that is still inactive,
    /// for when the mail sent at registration never arrived.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] for an unknown username and
    /// [`AuthError::AlreadyActive`] when there is nothing to activate.
    async fn resend_activation(&self, username: &str) -> Result<User, AuthError>;

    /// Activates the account named by an activation link and records the
    /// login that follows.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidLink`] for any undecodable, unknown, stale
    /// or already used link.
    async fn activate(&self, uidb64: &str, token: &str) -> Result<User, AuthError>;

    /// Verifies credentials and records the login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] with a single non-field message for
    /// wrong credentials and inactive accounts alike.
    async fn login(&self, form: &LoginForm) -> Result<User, AuthError>;

    /// Active user behind a session, if the account still exists.
    async fn session_user(&self, user_id: i32) -> Result<Option<User>, AuthError>;

    async fn get_user(&self, user_id: i32) -> Result<User, AuthError>;

    /// Changes username and email. Posts follow a username change.
    async fn update_profile(&self, user_id: i32, form: &ProfileForm) -> Result<User, AuthError>;

    /// Mails a reset link to every active account with the given email.
    /// Succeeds whether or not such an account exists.
    async fn request_password_reset(&self, form: &PasswordResetForm) -> Result<(), AuthError>;

    /// Resolves a reset link to its user.
    async fn check_reset_link(&self, uidb64: &str, token: &str) -> Result<User, AuthError>;

    /// Stores a new password through a reset link. The link stops working
    /// afterwards because the token is bound to the password hash.
    async fn confirm_password_reset(
        &self,
        uidb64: &str,
        token: &str,
        form: &SetPasswordForm,
    ) -> Result<User, AuthError>;
}
