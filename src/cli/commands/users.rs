//! User management command handlers

use crate::config::Config;
use crate::db::Store;
use crate::forms::SignUpForm;
use crate::services::AuthError;
use crate::state::SharedState;

pub async fn cmd_create_user(
    config: &Config,
    username: &str,
    email: &str,
    password: String,
    superuser: bool,
) -> anyhow::Result<()> {
    let form = SignUpForm {
        username: username.to_string(),
        email: email.to_string(),
        password1: password.clone(),
        password2: password,
        captcha: None,
    };

    let mut new_user = match form.validate(config.security.password_min_length) {
        Ok(user) => user,
        Err(errors) => anyhow::bail!("Invalid account details: {errors}"),
    };

    let store = Store::new(&config.general.database_path).await?;

    if store.username_taken(&new_user.username, None).await? {
        anyhow::bail!("A user with that username already exists.");
    }
    if store.email_taken(&new_user.email, None).await? {
        anyhow::bail!("A user with that email already exists.");
    }

    new_user.is_active = true;
    new_user.is_superuser = superuser;

    let user = store
        .create_user(&new_user, &config.security, chrono::Utc::now())
        .await?;

    println!("✓ Created user '{}' (ID: {})", user.username, user.id);
    if user.is_superuser {
        println!("  Superuser: yes");
    }

    Ok(())
}

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users yet.");
        println!();
        println!("Create one with: folio create-user <username> <email> --password <password>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let status = if user.is_active { "active" } else { "inactive" };
        let role = if user.is_superuser { " | superuser" } else { "" };
        println!("{:>5}  {} <{}>", user.id, user.username, user.email);
        println!(
            "       {status}{role} | joined {}",
            user.date_joined.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub async fn cmd_resend_activation(config: Config, username: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;

    match state.auth_service.resend_activation(username).await {
        Ok(user) => {
            println!("✓ Activation link sent to {}", user.email);
            Ok(())
        }
        Err(AuthError::UserNotFound) => anyhow::bail!("No user named '{username}'"),
        Err(AuthError::AlreadyActive) => {
            println!("'{username}' is already active; nothing to send.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
