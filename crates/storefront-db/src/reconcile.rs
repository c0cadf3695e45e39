//! Repair pass for the product/review relationship.

use sqlx::PgPool;

use crate::{reviews::refresh_product_stats, DbError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub orphaned_reviews_deleted: u64,
    pub products_checked: usize,
    pub products_corrected: usize,
}

/// Delete reviews whose product is gone, then recompute every product's
/// rating fields, one short transaction per product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on the first failing statement. Products
/// already processed keep their corrected values.
pub async fn reconcile_catalog(pool: &PgPool) -> Result<ReconcileReport, DbError> {
    let orphaned_reviews_deleted = sqlx::query(
        "DELETE FROM reviews r \
         WHERE NOT EXISTS (SELECT 1 FROM products p WHERE p.id = r.product_id)",
    )
    .execute(pool)
    .await?
    .rows_affected();
    if orphaned_reviews_deleted > 0 {
        tracing::warn!(orphaned_reviews_deleted, "deleted reviews with no product");
    }

    let product_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut report = ReconcileReport {
        orphaned_reviews_deleted,
        ..ReconcileReport::default()
    };
    for product_id in product_ids {
        // Deleted between the listing and now: nothing to repair.
        let Some(update) = refresh_product_stats(pool, product_id).await? else {
            continue;
        };
        report.products_checked += 1;
        if update.changed() {
            report.products_corrected += 1;
            tracing::warn!(
                product_id,
                previous_count = update.previous.count,
                previous_average = %update.previous.average,
                count = update.current.count,
                average = %update.current.average,
                "corrected drifted product rating"
            );
        }
    }

    Ok(report)
}
