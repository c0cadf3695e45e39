//! Catalog command handlers: seeding, rating reconciliation, and status.

use std::path::Path;

use clap::Subcommand;

/// Sub-commands available under `catalog`.
#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// Delete orphaned reviews and recompute every product's rating fields
    Reconcile,
    /// Show each product's review count and average rating
    Status,
}

/// Load and validate the YAML catalog, then insert it under `owner_email`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the owner does not
/// exist, or any insert fails.
pub(crate) async fn run_seed(
    pool: &sqlx::PgPool,
    owner_email: &str,
    path: &Path,
) -> anyhow::Result<()> {
    let products = storefront_core::load_catalog(path)?;
    let inserted = storefront_db::seed_catalog(pool, owner_email, &products)
        .await
        .map_err(|e| match e {
            storefront_db::DbError::NotFound => {
                anyhow::anyhow!("owner '{owner_email}' not found; run `users create` first")
            }
            other => other.into(),
        })?;

    println!(
        "seeded {inserted} of {} products from {}",
        products.len(),
        path.display()
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if any reconciliation statement fails.
pub(crate) async fn run_reconcile(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let report = storefront_db::reconcile_catalog(pool).await?;
    println!(
        "orphaned reviews deleted: {}\nproducts checked: {}\nproducts corrected: {}",
        report.orphaned_reviews_deleted, report.products_checked, report.products_corrected
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_status(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = storefront_db::list_products(pool).await?;
    if products.is_empty() {
        println!("no products found; run `db seed` first");
        return Ok(());
    }

    println!("{:<8}{:<10}{:<9}NAME", "ID", "REVIEWS", "RATING");
    for product in &products {
        println!(
            "{:<8}{:<10}{:<9}{}",
            product.id, product.num_of_reviews, product.average_rating, product.name
        );
    }
    Ok(())
}
