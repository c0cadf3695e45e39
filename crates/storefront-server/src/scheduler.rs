//! Background job scheduler.
//!
//! Registers the nightly rating reconciliation pass.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// The returned [`JobScheduler`] must be kept alive for the lifetime of the
/// process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<storefront_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_reconcile_job(&scheduler, pool, &config.reconcile_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Deletes orphaned reviews and recomputes every product's rating fields.
async fn register_reconcile_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting rating reconciliation");
            match storefront_db::reconcile_catalog(&pool).await {
                Ok(report) => tracing::info!(
                    orphaned_reviews_deleted = report.orphaned_reviews_deleted,
                    products_checked = report.products_checked,
                    products_corrected = report.products_corrected,
                    "scheduler: rating reconciliation complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: rating reconciliation failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered rating reconciliation job");
    Ok(())
}
