//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and, when
//! `POSTPULSE_SNAPSHOT_REFRESH_CRON` is set, registers a recurring job that
//! regenerates snapshots for every user with engagement data.

use std::sync::Arc;

use chrono::Utc;
use postpulse_analytics::{AnalyticsError, RunOutcome, RunRequest};
use postpulse_core::AppConfig;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::SharedSnapshotService;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the refresh job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    snapshots: SharedSnapshotService,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match config.snapshot_refresh_cron.as_deref() {
        Some(cron) => register_refresh_job(&scheduler, cron, pool, snapshots).await?,
        None => tracing::info!("scheduler: snapshot refresh disabled (no cron configured)"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring snapshot refresh on `cron` (six-field, UTC).
async fn register_refresh_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    snapshots: SharedSnapshotService,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let snapshots = Arc::clone(&snapshots);

        Box::pin(async move {
            tracing::info!("scheduler: starting snapshot refresh");
            let users = match postpulse_db::list_users_with_engagement(&pool).await {
                Ok(users) => users,
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to list users");
                    return;
                }
            };
            let tally = refresh_users(&snapshots, &users).await;
            tracing::info!(
                users = users.len(),
                completed = tally.completed,
                empty = tally.empty,
                skipped = tally.skipped,
                failed = tally.failed,
                "scheduler: snapshot refresh complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered snapshot refresh job");
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RefreshTally {
    completed: usize,
    empty: usize,
    skipped: usize,
    failed: usize,
}

/// Regenerate each user in turn. One user's failure never stops the rest.
async fn refresh_users(snapshots: &SharedSnapshotService, users: &[String]) -> RefreshTally {
    let mut tally = RefreshTally::default();

    for user_id in users {
        match snapshots
            .regenerate(&RunRequest::new(user_id.as_str()), Utc::now())
            .await
        {
            Ok(summary) if summary.outcome == RunOutcome::NoRecords => tally.empty += 1,
            Ok(_) => tally.completed += 1,
            Err(AnalyticsError::RunInProgress(_)) => {
                tracing::info!(user_id = %user_id, "scheduler: run already in progress; skipping");
                tally.skipped += 1;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "scheduler: snapshot refresh failed");
                tally.failed += 1;
            }
        }
    }

    tally
}
