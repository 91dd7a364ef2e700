use serde::{Deserialize, Serialize};

use super::FormErrors;
use super::account::clean_email;

/// Checks that both password fields are filled and equal.
/// Returns `true` when the pair is usable for further checks.
pub(crate) fn check_password_pair(
    errors: &mut FormErrors,
    first_field: &str,
    second_field: &str,
    first: &str,
    second: &str,
) -> bool {
    let mut ok = true;
    if first.is_empty() {
        errors.add(first_field, "This field is required.");
        ok = false;
    }
    if second.is_empty() {
        errors.add(second_field, "This field is required.");
        ok = false;
    }
    if ok && first != second {
        errors.add(second_field, "The two password fields didn't match.");
        ok = false;
    }
    ok
}

/// Password strength rules, reported under `field`.
pub fn validate_password(
    errors: &mut FormErrors,
    field: &str,
    password: &str,
    username: &str,
    min_length: usize,
) {
    if password.chars().count() < min_length {
        errors.add(
            field,
            format!("This password is too short. It must contain at least {min_length} characters."),
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        errors.add(field, "The password is too similar to the username.");
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordResetForm {
    pub email: String,
}

impl PasswordResetForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let email = clean_email(&mut errors, &self.email);
        errors.into_result(email)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

impl SetPasswordForm {
    pub fn validate(&self, username: &str, min_length: usize) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        if check_password_pair(
            &mut errors,
            "new_password1",
            "new_password2",
            &self.new_password1,
            &self.new_password2,
        ) {
            validate_password(
                &mut errors,
                "new_password2",
                &self.new_password2,
                username,
                min_length,
            );
        }
        errors.into_result(self.new_password1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(password: &str, username: &str) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_password(&mut errors, "password", password, username, 8);
        errors
    }

    #[test]
    fn strength_rules() {
        assert!(check("correct-horse", "alice").is_empty());
        assert!(check("short", "alice").has("password"));
        assert!(check("1234567890", "alice").has("password"));
        assert!(check("AliceAlice", "alicealice").has("password"));
    }

    #[test]
    fn set_password_requires_match() {
        let form = SetPasswordForm {
            new_password1: "new-secret-1".to_string(),
            new_password2: "new-secret-2".to_string(),
        };
        assert!(form.validate("alice", 8).unwrap_err().has("new_password2"));

        let form = SetPasswordForm {
            new_password1: "new-secret-1".to_string(),
            new_password2: "new-secret-1".to_string(),
        };
        assert_eq!(form.validate("alice", 8).unwrap(), "new-secret-1");
    }

    #[test]
    fn reset_form_requires_valid_email() {
        let form = PasswordResetForm {
            email: "nope".to_string(),
        };
        assert!(form.validate().unwrap_err().has("email"));
    }
}
