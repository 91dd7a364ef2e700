use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub mail: MailConfig,

    pub captcha: CaptchaConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Deployment environment name. Anything other than "production" unlocks
    /// test-only switches such as `captcha.testing_bypass`.
    pub environment: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/folio.db".to_string(),
            log_level: "info".to_string(),
            environment: "production".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Public base URL used when building links sent by email.
    pub site_url: String,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes without a request.
    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            site_url: "http://localhost:8000".to_string(),
            secure_cookies: true,
            session_inactivity_minutes: 60 * 24 * 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Signing key for activation and password-reset tokens.
    pub secret_key: String,

    /// Previous signing keys, still accepted when verifying tokens.
    pub secret_key_fallbacks: Vec<String>,

    /// Lifetime of activation and password-reset tokens (default: 3 days).
    pub token_timeout_seconds: u64,

    pub password_min_length: usize,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            secret_key_fallbacks: Vec::new(),
            token_timeout_seconds: 60 * 60 * 24 * 3,
            password_min_length: 8,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Log outgoing messages instead of sending them.
    #[default]
    Console,
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub backend: MailBackend,

    pub from_address: String,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub smtp_username: Option<String>,

    pub smtp_password: Option<String>,

    /// Use STARTTLS on the SMTP connection.
    pub smtp_starttls: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::Console,
            from_address: "Folio <noreply@localhost>".to_string(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_starttls: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub enabled: bool,

    pub site_key: String,

    pub secret_key: String,

    pub verify_url: String,

    /// Accept the literal response "PASSED" without contacting the verifier.
    /// Rejected by `Config::validate` in production.
    pub testing_bypass: bool,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            site_key: String::new(),
            secret_key: String::new(),
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
            testing_bypass: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Emit log lines as JSON objects instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        config.fill_ephemeral_secret();
        Ok(config)
    }

    /// Outside production a missing secret is replaced by a random one that
    /// lives as long as the process. Tokens minted with it die on restart.
    pub fn fill_ephemeral_secret(&mut self) {
        if self.security.secret_key.is_empty() && !self.general.is_production() {
            warn!("security.secret_key is not set; using a random key for this process only");
            self.security.secret_key = generate_secret_key();
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// `FOLIO_SECRET_KEY` and `FOLIO_DATABASE_URL` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("FOLIO_SECRET_KEY")
            && !secret.is_empty()
        {
            self.security.secret_key = secret;
        }

        if let Ok(url) = std::env::var("FOLIO_DATABASE_URL")
            && !url.is_empty()
        {
            self.general.database_path = url;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("folio").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".folio").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Writes a default config with a freshly generated secret key.
    /// Returns `false` when a config file already exists.
    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            return Ok(false);
        }

        let mut config = Self::default();
        config.security.secret_key = generate_secret_key();
        config.save_to_path(&path)?;
        info!("Created default config file: {}", path.display());
        Ok(true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.secret_key.is_empty() {
            anyhow::bail!(
                "security.secret_key must be set (run `folio init` or set FOLIO_SECRET_KEY)"
            );
        }
        if self.security.secret_key.len() < 32 {
            anyhow::bail!("security.secret_key must be at least 32 characters");
        }

        if self.captcha.testing_bypass && self.general.is_production() {
            anyhow::bail!("captcha.testing_bypass cannot be enabled in production");
        }

        if self.captcha.enabled
            && (self.captcha.site_key.is_empty() || self.captcha.secret_key.is_empty())
        {
            anyhow::bail!("captcha.site_key and captcha.secret_key are required when captcha is enabled");
        }

        if self.mail.backend == MailBackend::Smtp && self.mail.smtp_host.is_empty() {
            anyhow::bail!("mail.smtp_host cannot be empty when the smtp backend is selected");
        }

        url::Url::parse(&self.server.site_url)
            .with_context(|| format!("Invalid server.site_url: {}", self.server.site_url))?;

        if self.security.password_min_length == 0 {
            anyhow::bail!("security.password_min_length must be > 0");
        }

        Ok(())
    }
}

/// Generate a random 64 character hex secret.
#[must_use]
pub fn generate_secret_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
