//! Database operations for the `reviews` table and the product rating
//! aggregate derived from it.
//!
//! Every review write runs in a transaction that also recomputes the owning
//! product's `num_of_reviews` and `average_rating` before committing. The
//! product row is locked `FOR NO KEY UPDATE` for the duration, so concurrent
//! writes against one product serialize their recomputation instead of racing
//! on a stale read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use storefront_core::{Rating, RatingSummary};
use uuid::Uuid;

use crate::{is_unique_violation, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub public_id: Uuid,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub user_id: i64,
    pub product_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with the product and author fields shown alongside it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewDetailRow {
    pub id: i64,
    pub public_id: Uuid,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub user_id: i64,
    pub user_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub product_company: String,
    pub product_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub product_id: i64,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
}

/// Sparse review update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<Rating>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Derived rating fields of one product before and after a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsUpdate {
    pub product_id: i64,
    pub previous: RatingSummary,
    pub current: RatingSummary,
}

impl StatsUpdate {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns every review with its product and author details, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(pool: &PgPool) -> Result<Vec<ReviewDetailRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewDetailRow>(
        "SELECT r.id, r.public_id, r.rating, r.title, r.comment, \
                r.user_id, u.name AS user_name, \
                r.product_id, p.name AS product_name, p.company AS product_company, \
                p.price AS product_price, \
                r.created_at, r.updated_at \
         FROM reviews r \
         JOIN products p ON p.id = r.product_id \
         JOIN users u ON u.id = r.user_id \
         ORDER BY r.created_at DESC, r.id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns one review with its product and author details.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, review_id: i64) -> Result<Option<ReviewDetailRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewDetailRow>(
        "SELECT r.id, r.public_id, r.rating, r.title, r.comment, \
                r.user_id, u.name AS user_name, \
                r.product_id, p.name AS product_name, p.company AS product_company, \
                p.price AS product_price, \
                r.created_at, r.updated_at \
         FROM reviews r \
         JOIN products p ON p.id = r.product_id \
         JOIN users u ON u.id = r.user_id \
         WHERE r.id = $1",
    )
    .bind(review_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// The product → reviews relation: always queried live by foreign key,
/// never stored on the product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews_for_product(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<ReviewDetailRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewDetailRow>(
        "SELECT r.id, r.public_id, r.rating, r.title, r.comment, \
                r.user_id, u.name AS user_name, \
                r.product_id, p.name AS product_name, p.company AS product_company, \
                p.price AS product_price, \
                r.created_at, r.updated_at \
         FROM reviews r \
         JOIN products p ON p.id = r.product_id \
         JOIN users u ON u.id = r.user_id \
         WHERE r.product_id = $1 \
         ORDER BY r.created_at DESC, r.id DESC",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Recompute a product's review count and average rating on `conn`.
///
/// Locks the product row, reads every rating referencing it, and writes the
/// derived fields back. Returns `None` (and writes nothing) when the product
/// no longer exists. Intended to run inside the transaction of the review
/// write that triggered it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn recompute_product_stats(
    conn: &mut PgConnection,
    product_id: i64,
) -> Result<Option<StatsUpdate>, DbError> {
    let stored: Option<(i32, Decimal)> = sqlx::query_as(
        "SELECT num_of_reviews, average_rating FROM products WHERE id = $1 FOR NO KEY UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((count, average)) = stored else {
        tracing::debug!(product_id, "rating recompute skipped; product no longer exists");
        return Ok(None);
    };

    let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;
    let current = RatingSummary::from_ratings(&ratings);

    sqlx::query("UPDATE products SET num_of_reviews = $2, average_rating = $3 WHERE id = $1")
        .bind(product_id)
        .bind(current.count)
        .bind(current.average)
        .execute(&mut *conn)
        .await?;

    Ok(Some(StatsUpdate {
        product_id,
        previous: RatingSummary { count, average },
        current,
    }))
}

/// Recompute one product's rating fields in a transaction of its own.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the transaction fails.
pub async fn refresh_product_stats(
    pool: &PgPool,
    product_id: i64,
) -> Result<Option<StatsUpdate>, DbError> {
    let mut tx = pool.begin().await?;
    let update = recompute_product_stats(&mut tx, product_id).await?;
    tx.commit().await?;
    Ok(update)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a review and refreshes the product's rating fields atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist,
/// [`DbError::DuplicateReview`] if the user already reviewed it, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn create_review(pool: &PgPool, review: &NewReview) -> Result<ReviewRow, DbError> {
    let mut tx = pool.begin().await?;

    lock_product(&mut tx, review.product_id).await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        "INSERT INTO reviews (rating, title, comment, user_id, product_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, public_id, rating, title, comment, user_id, product_id, \
                   created_at, updated_at",
    )
    .bind(review.rating.get())
    .bind(&review.title)
    .bind(&review.comment)
    .bind(review.user_id)
    .bind(review.product_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::DuplicateReview {
                user_id: review.user_id,
                product_id: review.product_id,
            }
        } else {
            DbError::Sqlx(e)
        }
    })?;

    let stats = recompute_product_stats(&mut tx, row.product_id).await?;
    tx.commit().await?;

    log_stats("review created", row.id, stats.as_ref());
    Ok(row)
}

/// Applies a sparse update to a review and refreshes the product's rating
/// fields atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_review(
    pool: &PgPool,
    review_id: i64,
    changes: &ReviewChanges,
) -> Result<ReviewRow, DbError> {
    let mut tx = pool.begin().await?;

    let product_id = review_product_id(&mut tx, review_id).await?;
    lock_product(&mut tx, product_id).await?;

    let row = sqlx::query_as::<_, ReviewRow>(
        "UPDATE reviews \
         SET rating     = COALESCE($3, rating), \
             title      = COALESCE($4, title), \
             comment    = COALESCE($5, comment), \
             updated_at = NOW() \
         WHERE id = $1 AND product_id = $2 \
         RETURNING id, public_id, rating, title, comment, user_id, product_id, \
                   created_at, updated_at",
    )
    .bind(review_id)
    .bind(product_id)
    .bind(changes.rating.map(Rating::get))
    .bind(changes.title.as_deref())
    .bind(changes.comment.as_deref())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    let stats = recompute_product_stats(&mut tx, product_id).await?;
    tx.commit().await?;

    log_stats("review updated", row.id, stats.as_ref());
    Ok(row)
}

/// Deletes a review and refreshes the product's rating fields atomically.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn delete_review(pool: &PgPool, review_id: i64) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let product_id = review_product_id(&mut tx, review_id).await?;
    lock_product(&mut tx, product_id).await?;

    let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1 AND product_id = $2")
        .bind(review_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(DbError::NotFound);
    }

    let stats = recompute_product_stats(&mut tx, product_id).await?;
    tx.commit().await?;

    log_stats("review deleted", review_id, stats.as_ref());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Takes the per-product write lock shared by every review write path.
async fn lock_product(conn: &mut PgConnection, product_id: i64) -> Result<(), DbError> {
    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR NO KEY UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
    locked.map(|_| ()).ok_or(DbError::NotFound)
}

async fn review_product_id(conn: &mut PgConnection, review_id: i64) -> Result<i64, DbError> {
    sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
        .bind(review_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DbError::NotFound)
}

fn log_stats(action: &str, review_id: i64, stats: Option<&StatsUpdate>) {
    if let Some(stats) = stats {
        tracing::info!(
            review_id,
            product_id = stats.product_id,
            num_of_reviews = stats.current.count,
            average_rating = %stats.current.average,
            "{action}"
        );
    }
}
