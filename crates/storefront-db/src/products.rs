//! Database operations for the `products` table, including the cascading
//! delete that removes a product's reviews before the product itself.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use storefront_core::{NewProduct, ProductChanges};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub category: String,
    pub company: String,
    pub colors: Vec<String>,
    pub featured: bool,
    pub free_shipping: bool,
    pub inventory: i32,
    /// Mean review rating, one decimal place; derived from `reviews`.
    pub average_rating: Decimal,
    /// Number of reviews; derived from `reviews`.
    pub num_of_reviews: i32,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a successful cascading product delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub product_id: i64,
    pub reviews_deleted: u64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all products, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, public_id, name, price, description, image, category, company, colors, \
                featured, free_shipping, inventory, average_rating, num_of_reviews, user_id, \
                created_at, updated_at \
         FROM products \
         ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single product by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, product_id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, public_id, name, price, description, image, category, company, colors, \
                featured, free_shipping, inventory, average_rating, num_of_reviews, user_id, \
                created_at, updated_at \
         FROM products \
         WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a validated product owned by `user_id`. Rating fields start at zero.
///
/// Accepts any Postgres executor so the seeder can insert inside its own
/// transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_product<'e, E>(
    executor: E,
    user_id: i64,
    product: &NewProduct,
) -> Result<ProductRow, DbError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query_as::<_, ProductRow>(
        "INSERT INTO products \
           (name, price, description, image, category, company, colors, featured, \
            free_shipping, inventory, user_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING id, public_id, name, price, description, image, category, company, colors, \
                   featured, free_shipping, inventory, average_rating, num_of_reviews, user_id, \
                   created_at, updated_at",
    )
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.description)
    .bind(&product.image)
    .bind(product.category.as_str())
    .bind(product.company.as_str())
    .bind(&product.colors)
    .bind(product.featured)
    .bind(product.free_shipping)
    .bind(product.inventory)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// Applies a sparse update: `Some(v)` sets the column, `None` keeps it.
///
/// The derived rating columns are never touched here.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn update_product(
    pool: &PgPool,
    product_id: i64,
    changes: &ProductChanges,
) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(
        "UPDATE products \
         SET name          = COALESCE($2, name), \
             price         = COALESCE($3, price), \
             description   = COALESCE($4, description), \
             image         = COALESCE($5, image), \
             category      = COALESCE($6, category), \
             company       = COALESCE($7, company), \
             colors        = COALESCE($8, colors), \
             featured      = COALESCE($9, featured), \
             free_shipping = COALESCE($10, free_shipping), \
             inventory     = COALESCE($11, inventory), \
             updated_at    = NOW() \
         WHERE id = $1 \
         RETURNING id, public_id, name, price, description, image, category, company, colors, \
                   featured, free_shipping, inventory, average_rating, num_of_reviews, user_id, \
                   created_at, updated_at",
    )
    .bind(product_id)
    .bind(changes.name.as_deref())
    .bind(changes.price)
    .bind(changes.description.as_deref())
    .bind(changes.image.as_deref())
    .bind(changes.category.map(|c| c.as_str()))
    .bind(changes.company.map(|c| c.as_str()))
    .bind(changes.colors.as_deref())
    .bind(changes.featured)
    .bind(changes.free_shipping)
    .bind(changes.inventory)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Deletes a product and every review referencing it, in one transaction.
///
/// The product row is locked `FOR UPDATE` first, which also blocks concurrent
/// review inserts for it (their foreign-key check needs a key-share lock).
/// Reviews are deleted strictly before the product. Any failure rolls back
/// both deletes.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist (nothing is
/// deleted), or [`DbError::Sqlx`] if either delete fails.
pub async fn delete_product_cascade(
    pool: &PgPool,
    product_id: i64,
) -> Result<CascadeOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(DbError::NotFound);
    }

    let reviews_deleted = sqlx::query("DELETE FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let products_deleted = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if products_deleted != 1 {
        tracing::error!(
            product_id,
            reviews_deleted,
            "cascade delete removed reviews but not the product; rolling back"
        );
        return Err(DbError::NotFound);
    }

    tx.commit().await?;

    tracing::info!(product_id, reviews_deleted, "product deleted with its reviews");
    Ok(CascadeOutcome {
        product_id,
        reviews_deleted,
    })
}
