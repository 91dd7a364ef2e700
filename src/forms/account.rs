use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::password::{check_password_pair, validate_password};
use super::{FormErrors, required_text};
use crate::models::NewUser;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const INVALID_LOGIN: &str = "Please enter a correct username and password.";

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^[\w.@+-]+$")
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$")
}

pub(crate) fn clean_username(errors: &mut FormErrors, raw: &str) -> String {
    let username = required_text(errors, "username", raw, Some(USERNAME_MAX_LENGTH));
    if !username.is_empty() && !username_regex().is_match(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username
}

pub(crate) fn clean_email(errors: &mut FormErrors, raw: &str) -> String {
    let email = required_text(errors, "email", raw, Some(EMAIL_MAX_LENGTH));
    if !email.is_empty() && !email_regex().is_match(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    normalize_email(&email)
}

/// Lowercases the domain part, as mail servers treat it case-insensitively.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
    #[serde(rename = "g-recaptcha-response", skip_serializing)]
    pub captcha: Option<String>,
}

impl SignUpForm {
    /// Format checks only; uniqueness is checked against the store.
    pub fn validate(&self, password_min_length: usize) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::new();
        let username = clean_username(&mut errors, &self.username);
        let email = clean_email(&mut errors, &self.email);

        if check_password_pair(&mut errors, "password1", "password2", &self.password1, &self.password2) {
            validate_password(
                &mut errors,
                "password2",
                &self.password2,
                &username,
                password_min_length,
            );
        }

        errors.into_result(NewUser {
            username,
            email,
            password: self.password1.clone(),
            is_active: false,
            is_superuser: false,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(rename = "g-recaptcha-response", skip_serializing)]
    pub captcha: Option<String>,
    pub next: Option<String>,
}

impl LoginForm {
    /// Returns the trimmed username and the password as typed.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = required_text(&mut errors, "username", &self.username, None);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result((username, self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = clean_username(&mut errors, &self.username);
        let email = clean_email(&mut errors, &self.email);
        errors.into_result((username, email))
    }
}
