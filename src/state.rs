use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::mailer::mailer_from_config;
use crate::services::{
    AuthService, BlogService, Captcha, Clock, Mailer, SeaOrmAuthService, SeaOrmBlogService,
    SystemClock,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub clock: Arc<dyn Clock>,

    pub mailer: Arc<dyn Mailer>,

    pub captcha: Arc<Captcha>,

    pub blog_service: Arc<dyn BlogService>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    /// Builds every service from the configuration.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = mailer_from_config(&config.mail)?;
        Self::with_components(config, mailer, Arc::new(SystemClock)).await
    }

    /// Like [`SharedState::new`], with the mailer and clock supplied by the
    /// caller.
    pub async fn with_components(
        config: Config,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.security.secret_key.is_empty(),
            "security.secret_key must be set before tokens can be signed"
        );

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let captcha = Arc::new(Captcha::from_config(&config.captcha)?);

        let blog_service = Arc::new(SeaOrmBlogService::new(store.clone(), clock.clone()))
            as Arc<dyn BlogService + Send + Sync + 'static>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            &config,
            mailer.clone(),
            captcha.clone(),
            clock.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        Ok(Self {
            config: Arc::new(config),
            store,
            clock,
            mailer,
            captcha,
            blog_service,
            auth_service,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
