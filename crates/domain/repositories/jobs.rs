use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::jobs::JobEntity, value_objects::status_checks::StatusCheckPayload,
};

#[async_trait]
#[automock]
pub trait JobRepository {
    async fn enqueue_status_check(&self, payload: StatusCheckPayload) -> Result<Uuid>;

    /// Claims the oldest due status-check job, skipping rows other workers hold.
    /// A `running` job locked before `stale_before` lost its worker and is claimed again.
    async fn lock_next_status_check_job(
        &self,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<JobEntity>>;

    async fn mark_job_done(&self, job_id: Uuid) -> Result<()>;

    async fn reschedule_job(&self, job_id: Uuid, run_at: DateTime<Utc>, error: String)
    -> Result<()>;

    async fn mark_job_dead(&self, job_id: Uuid, error: String) -> Result<()>;
}
