use sqlx::PgPool;
use storefront_core::NewProduct;

use crate::DbError;

/// Insert catalog products owned by the user with `owner_email`.
///
/// Products whose `(name, company)` already exists are skipped, so the seed
/// can be re-run. Returns the number of products inserted. All inserts run in
/// a single transaction; if any fails the batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the owner does not exist, or
/// [`DbError::Sqlx`] if any statement fails.
pub async fn seed_catalog(
    pool: &PgPool,
    owner_email: &str,
    products: &[NewProduct],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    let owner_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(owner_email)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let mut inserted = 0usize;
    for product in products {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM products WHERE name = $1 AND company = $2)",
        )
        .bind(&product.name)
        .bind(product.company.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            continue;
        }

        crate::products::create_product(&mut *tx, owner_id, product).await?;
        inserted += 1;
    }

    tx.commit().await?;
    Ok(inserted)
}
