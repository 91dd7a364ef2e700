//! Stateless activation and password-reset tokens.
//!
//! A token is `<timestamp>-<mac>`: the timestamp is base36 seconds since
//! 2001-01-01 UTC and the mac is an HMAC-SHA256 over the purpose salt, the user
//! id, a fingerprint of mutable user state and the timestamp. Nothing is
//! stored; a token stops verifying once the fingerprinted state changes, the
//! timeout elapses, or its signing secret is no longer configured.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use crate::models::User;
use crate::services::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

/// 2001-01-01T00:00:00Z, the zero point of token timestamps.
const TOKEN_EPOCH: i64 = 978_307_200;

/// Longest base36 timestamp accepted; 13 digits already overflow `i64`.
const MAX_TIMESTAMP_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Bound to `is_active` and `last_login`: consumed by activation.
    Activation,
    /// Bound to the password hash, `last_login` and email: consumed by a
    /// password change.
    PasswordReset,
}

impl TokenPurpose {
    const fn key_salt(self) -> &'static str {
        match self {
            Self::Activation => "folio.token.activation",
            Self::PasswordReset => "folio.token.password-reset",
        }
    }
}

pub struct TokenGenerator {
    purpose: TokenPurpose,
    secret: String,
    fallbacks: Vec<String>,
    timeout_seconds: i64,
    clock: Arc<dyn Clock>,
}

impl TokenGenerator {
    #[must_use]
    pub fn new(
        purpose: TokenPurpose,
        secret: impl Into<String>,
        fallbacks: Vec<String>,
        timeout_seconds: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            purpose,
            secret: secret.into(),
            fallbacks: fallbacks.into_iter().filter(|s| !s.is_empty()).collect(),
            timeout_seconds: i64::try_from(timeout_seconds).unwrap_or(i64::MAX),
            clock,
        }
    }

    #[must_use]
    pub fn make_token(&self, user: &User) -> String {
        let timestamp = seconds_since_epoch(self.clock.now());
        self.token_with_timestamp(user, timestamp)
    }

    /// Returns `true` only for an untampered, unexpired token minted for this
    /// user in its current state.
    #[must_use]
    pub fn check_token(&self, user: &User, token: &str) -> bool {
        let Some((ts_part, mac_part)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = decode_base36(ts_part) else {
            return false;
        };
        let Ok(provided) = URL_SAFE_NO_PAD.decode(mac_part) else {
            return false;
        };

        let value = self.hash_value(user, timestamp);
        let signed_by_known_secret = std::iter::once(&self.secret)
            .chain(self.fallbacks.iter())
            .any(|secret| self.mac(secret, &value).verify_slice(&provided).is_ok());

        if !signed_by_known_secret {
            return false;
        }

        seconds_since_epoch(self.clock.now()) - timestamp <= self.timeout_seconds
    }

    fn token_with_timestamp(&self, user: &User, timestamp: i64) -> String {
        let value = self.hash_value(user, timestamp);
        let digest = self.mac(&self.secret, &value).finalize().into_bytes();
        format!("{}-{}", encode_base36(timestamp), URL_SAFE_NO_PAD.encode(digest))
    }

    fn mac(&self, secret: &str, value: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(self.purpose.key_salt().as_bytes());
        mac.update(&[0]);
        mac.update(value.as_bytes());
        mac
    }

    fn hash_value(&self, user: &User, timestamp: i64) -> String {
        // Sub-second precision is dropped so the value survives a database round trip.
        let login = user
            .last_login
            .map(|t| t.timestamp().to_string())
            .unwrap_or_default();

        match self.purpose {
            TokenPurpose::Activation => {
                format!("{}\0{}\0{}\0{}", user.id, user.is_active, login, timestamp)
            }
            TokenPurpose::PasswordReset => format!(
                "{}\0{}\0{}\0{}\0{}",
                user.id, user.password_hash, login, timestamp, user.email
            ),
        }
    }
}

fn seconds_since_epoch(at: DateTime<Utc>) -> i64 {
    at.timestamp() - TOKEN_EPOCH
}

// value % 36 is always in 0..36
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn encode_base36(mut value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value <= 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn decode_base36(input: &str) -> Option<i64> {
    if input.is_empty() || input.len() > MAX_TIMESTAMP_LEN {
        return None;
    }
    input.chars().try_fold(0i64, |acc, c| {
        let digit = i64::from(c.to_digit(36)?);
        acc.checked_mul(36)?.checked_add(digit)
    })
}

/// Encodes a user id for use in emailed links.
#[must_use]
pub fn encode_uid(id: i32) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Reverses [`encode_uid`]; any malformed input yields `None`.
#[must_use]
pub fn decode_uid(uidb64: &str) -> Option<i32> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse().ok()
}
