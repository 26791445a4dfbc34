use acquiring::domain::repositories::jobs::JobRepository;
use anyhow::Result;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use crate::{config::config_model::StatusPollingConfig, usecases::status_polling::StatusPollingUseCase};

pub async fn run(
    job_repo: Arc<dyn JobRepository + Send + Sync>,
    usecase: Arc<StatusPollingUseCase>,
    config: StatusPollingConfig,
) -> Result<()> {
    let idle = Duration::from_secs(config.idle_secs);
    info!(
        backoff_secs = config.backoff_secs,
        time_limit_secs = config.time_limit_secs,
        lease_secs = config.lease_secs,
        "status_polling: starting worker loop"
    );
    loop {
        let stale_before = config.stale_before(Utc::now());
        match job_repo.lock_next_status_check_job(stale_before).await {
            Ok(Some(job)) => {
                info!(job_id = %job.id, attempts = job.attempts, "status_polling: processing job");
                if let Err(e) = usecase.process_job(&job).await {
                    error!(
                        job_id = %job.id,
                        error = %e,
                        "status_polling: failed to process job"
                    );
                    let run_at = Utc::now() + chrono::Duration::seconds(config.backoff_secs as i64);
                    if let Err(mark_err) = job_repo.reschedule_job(job.id, run_at, e.to_string()).await {
                        error!(
                            job_id = %job.id,
                            error = %mark_err,
                            "status_polling: failed to release job"
                        );
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(idle).await;
            }
            Err(e) => {
                error!(
                    error = %e,
                    "status_polling: error locking next job"
                );
                tokio::time::sleep(idle).await;
            }
        }
    }
}
