use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use std::sync::Mutex;
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{posts, users};
use crate::models::{NewUser, User};

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password_hash: model.password_hash,
            is_active: model.is_active,
            is_superuser: model.is_superuser,
            date_joined: model.date_joined,
            last_login: model.last_login,
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a user, hashing the password with the configured Argon2 cost.
    pub async fn create(
        &self,
        new_user: &NewUser,
        config: &SecurityConfig,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let password = new_user.password.clone();
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let model = users::ActiveModel {
            username: Set(new_user.username.clone()),
            email: Set(new_user.email.clone()),
            email_key: Set(new_user.email.to_lowercase()),
            password_hash: Set(password_hash),
            is_active: Set(new_user.is_active),
            is_superuser: Set(new_user.is_superuser),
            date_joined: Set(now),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .with_context(|| format!("Failed to create user {}", new_user.username))?;

        Ok(User::from(model))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Active accounts registered under `email`, compared case-insensitively.
    pub async fn list_active_by_email(&self, email: &str) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .filter(users::Column::EmailKey.eq(email.to_lowercase()))
            .filter(users::Column::IsActive.eq(true))
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query users by email")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn username_taken(&self, username: &str, except_id: Option<i32>) -> Result<bool> {
        let mut query = users::Entity::find().filter(users::Column::Username.eq(username));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }
        Ok(query.one(&self.conn).await?.is_some())
    }

    pub async fn email_taken(&self, email: &str, except_id: Option<i32>) -> Result<bool> {
        let mut query =
            users::Entity::find().filter(users::Column::EmailKey.eq(email.to_lowercase()));
        if let Some(id) = except_id {
            query = query.filter(users::Column::Id.ne(id));
        }
        Ok(query.one(&self.conn).await?.is_some())
    }

    /// Returns the user when the password matches.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    ///
    /// An unknown username still pays for one verification against a dummy
    /// hash with the configured params, so response time does not reveal
    /// which usernames exist.
    pub async fn verify_password(
        &self,
        username: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<Option<User>> {
        let user = self.get_by_username(username).await?;

        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let password = password.to_string();
        let config = config.clone();

        let is_valid = task::spawn_blocking(move || {
            let password_hash = match stored_hash {
                Some(hash) => hash,
                None => dummy_hash(&config)?,
            };
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(user.filter(|_| is_valid))
    }

    pub async fn set_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        let user = self.find_model(id).await?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        Ok(User::from(active.update(&self.conn).await?))
    }

    /// Marks the account active and records the login that follows activation.
    pub async fn activate(&self, id: i32, now: DateTime<Utc>) -> Result<User> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(true);
        active.last_login = Set(Some(now));
        Ok(User::from(active.update(&self.conn).await?))
    }

    pub async fn touch_last_login(&self, id: i32, now: DateTime<Utc>) -> Result<User> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(now));
        Ok(User::from(active.update(&self.conn).await?))
    }

    /// Updates username and email. A username change is carried over to the
    /// `author` column of every post written under the old name, in the same
    /// transaction.
    pub async fn update_profile(&self, id: i32, username: &str, email: &str) -> Result<User> {
        let txn = self.conn.begin().await?;

        let user = users::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;
        let old_username = user.username.clone();

        let mut active: users::ActiveModel = user.into();
        active.username = Set(username.to_string());
        active.email = Set(email.to_string());
        active.email_key = Set(email.to_lowercase());
        let updated = active.update(&txn).await?;

        if old_username != username {
            posts::Entity::update_many()
                .col_expr(posts::Column::Author, Expr::value(username))
                .filter(posts::Column::Author.eq(old_username))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(User::from(updated))
    }

    pub async fn set_superuser(&self, id: i32, is_superuser: bool) -> Result<User> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_superuser = Set(is_superuser);
        Ok(User::from(active.update(&self.conn).await?))
    }

    async fn find_model(&self, id: i32) -> Result<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))
    }
}

/// Hash of a fixed throwaway password, cached per Argon2 params.
fn dummy_hash(config: &SecurityConfig) -> Result<String> {
    static CACHE: Mutex<Vec<((u32, u32, u32), String)>> = Mutex::new(Vec::new());

    let key = (
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
    );
    let mut cache = CACHE
        .lock()
        .map_err(|_| anyhow::anyhow!("Dummy hash cache poisoned"))?;
    if let Some((_, hash)) = cache.iter().find(|(k, _)| *k == key) {
        return Ok(hash.clone());
    }

    let hash = hash_password("folio-unknown-user", Some(config))?;
    cache.push((key, hash.clone()));
    Ok(hash)
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
