use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SecurityConfig;
use crate::db::Store;

/// Token retention cron: daily at 03:00.
const CLEANUP_CRON: &str = "0 0 3 * * *";

/// Background retention jobs, decoupled from the request hot path so
/// login/refresh never pay deletion cost.
pub struct Scheduler {
    store: Store,
    security: SecurityConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        Self {
            store,
            security,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let retention_days = self.security.inactive_token_retention_days;
        let running = Arc::clone(&self.running);

        let job = Job::new_async(CLEANUP_CRON, move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "token_cleanup", "Starting token cleanup");

                if let Err(e) = run_cleanup(&store, retention_days).await {
                    error!(event = "job_failed", job_name = "token_cleanup", error = %e, "Token cleanup failed");
                }

                info!(
                    event = "job_finished",
                    job_name = "token_cleanup",
                    duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Token cleanup finished"
                );
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        // Keep the scheduler alive until stopped; jobs die with it.
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            if !*self.running.read().await {
                break;
            }
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// Single retention pass, used by the `cleanup-tokens` command.
    pub async fn run_once(&self) -> Result<()> {
        run_cleanup(&self.store, self.security.inactive_token_retention_days).await
    }
}

async fn run_cleanup(store: &Store, retention_days: i64) -> Result<()> {
    let refresh_deleted = store.cleanup_refresh_tokens(retention_days).await?;
    let reset_deleted = store.prune_reset_tokens().await?;

    info!(
        refresh_deleted,
        reset_deleted, "Token retention pass complete"
    );

    Ok(())
}
