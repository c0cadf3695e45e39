//! User administration. Plaintext tokens are printed once and never stored.

use clap::Subcommand;
use storefront_core::{
    generate_token, hash_token, validate_email, validate_user_name, AppConfig, Role,
};

/// Sub-commands available under `users`.
#[derive(Debug, Subcommand)]
pub enum UsersCommands {
    /// Create a user and print its bearer token
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },
    /// Issue a new bearer token, invalidating the old one
    RotateToken {
        #[arg(long)]
        email: String,
    },
}

/// # Errors
///
/// Returns an error if the name or email is invalid, the email is taken, or
/// the insert fails.
pub(crate) async fn run_create(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    name: &str,
    email: &str,
    admin: bool,
) -> anyhow::Result<()> {
    let role = if admin { Role::Admin } else { Role::User };
    let name = validate_user_name(name)?;
    let email = validate_email(email)?;
    let token = generate_token();
    let user = storefront_db::create_user(
        pool,
        &name,
        &email,
        role,
        &hash_token(&config.token_salt, &token),
    )
    .await?;

    tracing::info!(user_id = user.id, role = %role, "user created");
    println!("created {} user {} <{}>", role, user.name, user.email);
    println!("token: {token}");
    println!("store this token now; it cannot be shown again");
    Ok(())
}

/// # Errors
///
/// Returns an error if no user has `email` or the update fails.
pub(crate) async fn run_rotate_token(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    email: &str,
) -> anyhow::Result<()> {
    let email = validate_email(email)?;
    let token = generate_token();
    storefront_db::rotate_user_token(pool, &email, &hash_token(&config.token_salt, &token))
        .await
        .map_err(|e| match e {
            storefront_db::DbError::NotFound => anyhow::anyhow!("no user with email '{email}'"),
            other => other.into(),
        })?;

    println!("new token for {email}: {token}");
    Ok(())
}
