//! Database operations for the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use storefront_core::{Role, UserChanges};
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

/// A row from the `users` table. The token hash is never selected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Parsed role; rows are constrained to `admin`/`user` by the schema.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }
}

/// Creates a user with an already-hashed API token.
///
/// # Errors
///
/// Returns [`DbError::DuplicateEmail`] when the email is taken, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    role: Role,
    api_token_hash: &str,
) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, email, role, api_token_hash) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, public_id, name, email, role, created_at, updated_at",
    )
    .bind(name)
    .bind(email)
    .bind(role.as_str())
    .bind(api_token_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::DuplicateEmail(email.to_owned())
        } else {
            DbError::Sqlx(e)
        }
    })
}

/// Looks up the user owning a bearer token hash.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_token_hash(
    pool: &PgPool,
    api_token_hash: &str,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, public_id, name, email, role, created_at, updated_at \
         FROM users WHERE api_token_hash = $1",
    )
    .bind(api_token_hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, public_id, name, email, role, created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Replaces a user's token hash, invalidating the previous token.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has that email.
pub async fn rotate_user_token(
    pool: &PgPool,
    email: &str,
    api_token_hash: &str,
) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET api_token_hash = $2, updated_at = NOW() \
         WHERE email = $1 \
         RETURNING id, public_id, name, email, role, created_at, updated_at",
    )
    .bind(email)
    .bind(api_token_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user(pool: &PgPool, user_id: i64) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, public_id, name, email, role, created_at, updated_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Users holding `role`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_users_by_role(pool: &PgPool, role: Role) -> Result<Vec<UserRow>, DbError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, public_id, name, email, role, created_at, updated_at \
         FROM users WHERE role = $1 ORDER BY id",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Sparse name/email update. `None` fields are left unchanged.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the user does not exist,
/// [`DbError::DuplicateEmail`] if the new email is taken, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_user_profile(
    pool: &PgPool,
    user_id: i64,
    changes: &UserChanges,
) -> Result<UserRow, DbError> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users \
         SET name       = COALESCE($2, name), \
             email      = COALESCE($3, email), \
             updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, public_id, name, email, role, created_at, updated_at",
    )
    .bind(user_id)
    .bind(changes.name.as_deref())
    .bind(changes.email.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::DuplicateEmail(changes.email.clone().unwrap_or_default())
        } else {
            DbError::Sqlx(e)
        }
    })?
    .ok_or(DbError::NotFound)
}
