//! Human-verification challenge on the login and sign-up forms.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::config::CaptchaConfig;

/// Response value accepted when `captcha.testing_bypass` is on.
pub const TESTING_RESPONSE: &str = "PASSED";

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, response: &str) -> bool;
}

/// Google reCAPTCHA `siteverify` client.
pub struct ReCaptchaVerifier {
    client: reqwest::Client,
    secret_key: String,
    verify_url: String,
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl ReCaptchaVerifier {
    #[must_use]
    pub const fn new(client: reqwest::Client, secret_key: String, verify_url: String) -> Self {
        Self {
            client,
            secret_key,
            verify_url,
        }
    }
}

#[async_trait]
impl CaptchaVerifier for ReCaptchaVerifier {
    async fn verify(&self, response: &str) -> bool {
        let params = [("secret", self.secret_key.as_str()), ("response", response)];

        let result = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let body = match result {
            Ok(resp) => resp.json::<SiteVerifyResponse>().await,
            Err(e) => {
                warn!("Captcha verification request failed: {e}");
                return false;
            }
        };

        match body {
            Ok(body) => {
                if !body.success {
                    warn!(errors = ?body.error_codes, "Captcha rejected");
                }
                body.success
            }
            Err(e) => {
                warn!("Captcha verification returned an unreadable body: {e}");
                false
            }
        }
    }
}

/// Decides whether a submitted challenge response is acceptable.
pub struct Captcha {
    enabled: bool,
    testing_bypass: bool,
    site_key: String,
    verifier: Option<Arc<dyn CaptchaVerifier>>,
}

impl Captcha {
    pub fn from_config(config: &CaptchaConfig) -> anyhow::Result<Self> {
        let verifier: Option<Arc<dyn CaptchaVerifier>> = if config.enabled {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .user_agent("Folio/1.0")
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build captcha HTTP client: {e}"))?;
            Some(Arc::new(ReCaptchaVerifier::new(
                client,
                config.secret_key.clone(),
                config.verify_url.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            enabled: config.enabled,
            testing_bypass: config.testing_bypass,
            site_key: config.site_key.clone(),
            verifier,
        })
    }

    #[must_use]
    pub fn with_verifier(verifier: Arc<dyn CaptchaVerifier>, site_key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            testing_bypass: false,
            site_key: site_key.into(),
            verifier: Some(verifier),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            testing_bypass: false,
            site_key: String::new(),
            verifier: None,
        }
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.enabled || self.testing_bypass
    }

    #[must_use]
    pub fn site_key(&self) -> Option<&str> {
        self.is_required().then_some(self.site_key.as_str())
    }

    pub async fn check(&self, response: Option<&str>) -> bool {
        if !self.is_required() {
            return true;
        }

        let Some(response) = response.map(str::trim).filter(|r| !r.is_empty()) else {
            return false;
        };

        if self.testing_bypass {
            return response == TESTING_RESPONSE;
        }

        match &self.verifier {
            Some(verifier) => verifier.verify(response).await,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AcceptToken(&'static str);

    #[async_trait]
    impl CaptchaVerifier for AcceptToken {
        async fn verify(&self, response: &str) -> bool {
            response == self.0
        }
    }

    #[tokio::test]
    async fn disabled_captcha_accepts_anything() {
        let captcha = Captcha::disabled();
        assert!(captcha.check(None).await);
        assert!(captcha.check(Some("whatever")).await);
        assert!(captcha.site_key().is_none());
    }

    #[tokio::test]
    async fn testing_bypass_only_accepts_marker() {
        let config = CaptchaConfig {
            testing_bypass: true,
            ..CaptchaConfig::default()
        };
        let captcha = Captcha::from_config(&config).unwrap();

        assert!(captcha.check(Some(TESTING_RESPONSE)).await);
        assert!(!captcha.check(Some("FAILED")).await);
        assert!(!captcha.check(None).await);
    }

    #[tokio::test]
    async fn enabled_captcha_delegates_to_verifier() {
        let captcha = Captcha::with_verifier(Arc::new(AcceptToken("good")), "site");

        assert!(captcha.check(Some("good")).await);
        assert!(!captcha.check(Some("bad")).await);
        assert!(!captcha.check(Some("   ")).await);
        assert_eq!(captcha.site_key(), Some("site"));
    }
}
