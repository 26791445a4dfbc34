use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::jobs},
};
use domain::{
    entities::jobs::{InsertJobEntity, JobEntity},
    repositories::jobs::JobRepository,
    value_objects::{
        enums::job_statuses::JobStatus,
        status_checks::{STATUS_CHECK_JOB_TYPE, StatusCheckPayload},
    },
};

pub struct JobPostgres {
    db_pool: Arc<PgPoolSquad>,
    worker_id: String,
}

impl JobPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self {
            db_pool,
            worker_id: Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl JobRepository for JobPostgres {
    async fn enqueue_status_check(&self, payload: StatusCheckPayload) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let insert_entity = InsertJobEntity {
            type_: STATUS_CHECK_JOB_TYPE.to_string(),
            payload: serde_json::to_value(payload)?,
            run_at: now,
            attempts: 0,
            locked_at: None,
            locked_by: None,
            status: JobStatus::Queued.to_string(),
            error: None,
            created_at: now,
        };

        let job_id = diesel::insert_into(jobs::table)
            .values(&insert_entity)
            .returning(jobs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(job_id)
    }

    async fn lock_next_status_check_job(
        &self,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<JobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();
        let running = JobStatus::Running.to_string();

        let job = conn.transaction::<Option<JobEntity>, diesel::result::Error, _>(|conn| {
            let candidate = jobs::table
                .select(JobEntity::as_select())
                .filter(jobs::type_.eq(STATUS_CHECK_JOB_TYPE))
                .filter(
                    jobs::status
                        .eq(JobStatus::Queued.to_string())
                        .and(jobs::run_at.le(now))
                        .or(jobs::status
                            .eq(running.clone())
                            .and(jobs::locked_at.lt(stale_before))),
                )
                .order(jobs::run_at.asc())
                .for_update()
                .skip_locked()
                .first::<JobEntity>(conn)
                .optional()?;

            let Some(job) = candidate else {
                return Ok(None);
            };
            if job.status == running {
                warn!(
                    job_id = %job.id,
                    locked_by = ?job.locked_by,
                    locked_at = ?job.locked_at,
                    "jobs: reclaiming status check abandoned by its worker"
                );
            }

            let claimed = diesel::update(jobs::table.find(job.id))
                .set((
                    jobs::status.eq(JobStatus::Running.to_string()),
                    jobs::attempts.eq(job.attempts + 1),
                    jobs::locked_at.eq(Some(now)),
                    jobs::locked_by.eq(Some(self.worker_id.clone())),
                ))
                .returning(JobEntity::as_select())
                .get_result::<JobEntity>(conn)?;

            Ok(Some(claimed))
        })?;

        Ok(job)
    }

    async fn mark_job_done(&self, job_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(JobStatus::Done.to_string()),
                jobs::error.eq::<Option<String>>(None),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn reschedule_job(
        &self,
        job_id: Uuid,
        run_at: DateTime<Utc>,
        error: String,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(JobStatus::Queued.to_string()),
                jobs::run_at.eq(run_at),
                jobs::error.eq(Some(error)),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_job_dead(&self, job_id: Uuid, error: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(JobStatus::Dead.to_string()),
                jobs::error.eq(Some(error)),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
