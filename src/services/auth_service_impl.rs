//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{Config, SecurityConfig};
use crate::db::Store;
use crate::forms::account::INVALID_LOGIN;
use crate::forms::{FormErrors, LoginForm, PasswordResetForm, ProfileForm, SetPasswordForm, SignUpForm};
use crate::models::User;
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::captcha::Captcha;
use crate::services::clock::Clock;
use crate::services::mailer::{EmailMessage, Mailer};
use crate::services::token::{TokenGenerator, TokenPurpose, decode_uid, encode_uid};

const CAPTCHA_FIELD: &str = "captcha";

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    site_url: String,
    activation_tokens: TokenGenerator,
    reset_tokens: TokenGenerator,
    mailer: Arc<dyn Mailer>,
    captcha: Arc<Captcha>,
    clock: Arc<dyn Clock>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        config: &Config,
        mailer: Arc<dyn Mailer>,
        captcha: Arc<Captcha>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = |purpose| {
            TokenGenerator::new(
                purpose,
                config.security.secret_key.clone(),
                config.security.secret_key_fallbacks.clone(),
                config.security.token_timeout_seconds,
                Arc::clone(&clock),
            )
        };

        Self {
            store,
            security: config.security.clone(),
            site_url: config.server.site_url.trim_end_matches('/').to_string(),
            activation_tokens: tokens(TokenPurpose::Activation),
            reset_tokens: tokens(TokenPurpose::PasswordReset),
            mailer,
            captcha,
            clock,
        }
    }

    async fn check_captcha(&self, response: Option<&str>, errors: &mut FormErrors) {
        if self.captcha.check(response).await {
            return;
        }
        if response.is_none_or(|r| r.trim().is_empty()) {
            errors.add(CAPTCHA_FIELD, "This field is required.");
        } else {
            errors.add(CAPTCHA_FIELD, "Error verifying reCAPTCHA, please try again.");
        }
    }

    /// Decodes the uid of an emailed link and checks its token.
    async fn resolve_link(
        &self,
        tokens: &TokenGenerator,
        uidb64: &str,
        token: &str,
    ) -> Result<User, AuthError> {
        let Some(id) = decode_uid(uidb64) else {
            return Err(AuthError::InvalidLink);
        };
        let Some(user) = self.store.get_user(id).await? else {
            return Err(AuthError::InvalidLink);
        };
        if !tokens.check_token(&user, token) {
            return Err(AuthError::InvalidLink);
        }
        Ok(user)
    }

    fn link(&self, path: &str, user: &User, tokens: &TokenGenerator) -> String {
        format!(
            "{}/{path}/{}/{}/",
            self.site_url,
            encode_uid(user.id),
            tokens.make_token(user)
        )
    }

    fn activation_email(&self, user: &User) -> EmailMessage {
        let link = self.link("activate", user, &self.activation_tokens);
        EmailMessage {
            to: user.email.clone(),
            subject: "Activate Your Account".to_string(),
            text_body: format!(
                "Hi {},\n\nPlease click on the link below to confirm your registration:\n\n{link}\n",
                user.username
            ),
            html_body: format!(
                "<p>Hi {},</p><p>Please click on the link below to confirm your registration:</p><p><a href=\"{link}\">{link}</a></p>",
                user.username
            ),
        }
    }

    fn reset_email(&self, user: &User) -> EmailMessage {
        let link = self.link("password-reset-confirm", user, &self.reset_tokens);
        EmailMessage {
            to: user.email.clone(),
            subject: "Password reset".to_string(),
            text_body: format!(
                "You're receiving this email because you requested a password reset for your user account.\n\nPlease go to the following page and choose a new password:\n\n{link}\n\nYour username, in case you've forgotten: {}\n",
                user.username
            ),
            html_body: format!(
                "<p>You're receiving this email because you requested a password reset for your user account.</p><p>Please go to the following page and choose a new password:</p><p><a href=\"{link}\">{link}</a></p><p>Your username, in case you've forgotten: {}</p>",
                user.username
            ),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, form: &SignUpForm) -> Result<User, AuthError> {
        let mut errors = FormErrors::new();
        self.check_captcha(form.captcha.as_deref(), &mut errors).await;

        let new_user = match form.validate(self.security.password_min_length) {
            Ok(new_user) => Some(new_user),
            Err(form_errors) => {
                errors.extend(form_errors);
                None
            }
        };

        if let Some(new_user) = &new_user {
            if self.store.username_taken(&new_user.username, None).await? {
                errors.add("username", "A user with that username already exists.");
            }
            if self.store.email_taken(&new_user.email, None).await? {
                errors.add("email", "A user with that email already exists.");
            }
        }

        let new_user = match new_user {
            Some(new_user) if errors.is_empty() => new_user,
            _ => return Err(AuthError::Validation(errors)),
        };

        let user = self
            .store
            .create_user(&new_user, &self.security, self.clock.now())
            .await?;

        info!(
            event = "user_registered",
            user_id = user.id,
            username = %user.username,
            "User registered, awaiting activation"
        );

        if let Err(e) = self.mailer.send(self.activation_email(&user)).await {
            warn!(
                event = "activation_mail_failed",
                user_id = user.id,
                username = %user.username,
                error = %e,
                "Activation mail not sent; `folio resend-activation` can retry"
            );
            return Err(e.into());
        }
        Ok(user)
    }

    async fn resend_activation(&self, username: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_active {
            return Err(AuthError::AlreadyActive);
        }

        self.mailer.send(self.activation_email(&user)).await?;
        info!(
            event = "activation_resent",
            user_id = user.id,
            username = %user.username,
            "Activation mail sent again"
        );
        Ok(user)
    }

    async fn activate(&self, uidb64: &str, token: &str) -> Result<User, AuthError> {
        let user = self
            .resolve_link(&self.activation_tokens, uidb64, token)
            .await?;

        if user.is_active {
            return Err(AuthError::InvalidLink);
        }

        let user = self.store.activate_user(user.id, self.clock.now()).await?;
        info!(
            event = "user_activated",
            user_id = user.id,
            username = %user.username,
            "Account activated"
        );
        Ok(user)
    }

    async fn login(&self, form: &LoginForm) -> Result<User, AuthError> {
        let mut errors = FormErrors::new();
        self.check_captcha(form.captcha.as_deref(), &mut errors).await;

        let (username, password) = match form.validate() {
            Ok(credentials) => credentials,
            Err(form_errors) => {
                errors.extend(form_errors);
                return Err(AuthError::Validation(errors));
            }
        };

        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let user = self
            .store
            .verify_user_password(&username, &password, &self.security)
            .await?
            .filter(|u| u.is_active);

        let Some(user) = user else {
            warn!(event = "login_failed", username = %username, "Login failed");
            return Err(AuthError::Validation(FormErrors::single(
                crate::forms::NON_FIELD_ERRORS,
                INVALID_LOGIN,
            )));
        };

        let user = self.store.touch_last_login(user.id, self.clock.now()).await?;
        info!(event = "user_logged_in", user_id = user.id, "User logged in");
        Ok(user)
    }

    async fn session_user(&self, user_id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user(user_id).await?.filter(|u| u.is_active))
    }

    async fn get_user(&self, user_id: i32) -> Result<User, AuthError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn update_profile(&self, user_id: i32, form: &ProfileForm) -> Result<User, AuthError> {
        let (username, email) = form.validate().map_err(AuthError::Validation)?;

        let mut errors = FormErrors::new();
        if self.store.username_taken(&username, Some(user_id)).await? {
            errors.add("username", "A user with that username already exists.");
        }
        if self.store.email_taken(&email, Some(user_id)).await? {
            errors.add("email", "A user with that email already exists.");
        }
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let before = self.get_user(user_id).await?;
        let user = self
            .store
            .update_user_profile(user_id, &username, &email)
            .await?;

        if before.username != user.username {
            info!(
                event = "username_changed",
                user_id,
                from = %before.username,
                to = %user.username,
                "Username changed, authored posts follow"
            );
        }
        Ok(user)
    }

    async fn request_password_reset(&self, form: &PasswordResetForm) -> Result<(), AuthError> {
        let email = form.validate().map_err(AuthError::Validation)?;

        for user in self.store.list_active_users_by_email(&email).await? {
            if let Err(e) = self.mailer.send(self.reset_email(&user)).await {
                error!(user_id = user.id, "Failed to send password reset email: {e}");
            } else {
                info!(event = "password_reset_requested", user_id = user.id, "Reset link sent");
            }
        }
        Ok(())
    }

    async fn check_reset_link(&self, uidb64: &str, token: &str) -> Result<User, AuthError> {
        self.resolve_link(&self.reset_tokens, uidb64, token).await
    }

    async fn confirm_password_reset(
        &self,
        uidb64: &str,
        token: &str,
        form: &SetPasswordForm,
    ) -> Result<User, AuthError> {
        let user = self.check_reset_link(uidb64, token).await?;

        let password = form
            .validate(&user.username, self.security.password_min_length)
            .map_err(AuthError::Validation)?;

        let user = self
            .store
            .set_user_password(user.id, &password, &self.security)
            .await?;

        info!(event = "password_reset", user_id = user.id, "Password reset completed");
        Ok(user)
    }
}
