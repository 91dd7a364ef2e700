//! Form validation.
//!
//! Every use case has its own form struct, deserialized from the urlencoded
//! body. `validate` yields either the cleaned values or a [`FormErrors`]
//! record that is rendered back together with the submitted values.

pub mod account;
pub mod comment;
pub mod password;
pub mod post;

pub use account::{LoginForm, ProfileForm, SignUpForm};
pub use comment::CommentForm;
pub use password::{PasswordResetForm, SetPasswordForm, validate_password};
pub use post::PostForm;

use serde::Serialize;
use std::collections::BTreeMap;

/// Field name under which errors that belong to no single field are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    #[serde(flatten)]
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Moves every message of `other` into `self`.
    pub fn extend(&mut self, other: Self) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn non_field(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS)
    }

    /// `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Trims `value`, records an error when it is empty or longer than `max`
/// characters, and returns the trimmed text.
pub(crate) fn required_text(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    max: Option<usize>,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if let Some(max) = max {
        let len = value.chars().count();
        if len > max {
            errors.add(
                field,
                format!("Ensure this value has at most {max} characters (it has {len})."),
            );
        }
    }
    value.to_string()
}

/// Trimmed value, or `None` when blank.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate_per_field() {
        let mut errors = FormErrors::new();
        assert!(errors.is_empty());

        errors.add("title", "first");
        errors.add("title", "second");
        errors.add_non_field("whole form");

        assert_eq!(errors.get("title").len(), 2);
        assert_eq!(errors.non_field(), ["whole form".to_string()]);
        assert!(errors.get("content").is_empty());
        assert!(errors.clone().into_result(()).is_err());
    }

    #[test]
    fn errors_serialize_as_field_map() {
        let errors = FormErrors::single("author", "This field is required.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["author"][0], "This field is required.");
    }

    #[test]
    fn required_text_trims_and_checks_length() {
        let mut errors = FormErrors::new();
        assert_eq!(required_text(&mut errors, "a", "  hi  ", Some(5)), "hi");
        assert!(errors.is_empty());

        required_text(&mut errors, "b", "   ", None);
        required_text(&mut errors, "c", "toolong", Some(3));
        assert!(errors.has("b"));
        assert!(errors.has("c"));
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(None), None);
        assert_eq!(optional_text(Some(" x ")), Some("x".to_string()));
    }
}
