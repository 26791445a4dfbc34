use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow, bail};
use diesel::{
    QueryableByName, RunQueryDsl, sql_query,
    sql_types::{Bool, Text},
};
use tracing::{debug, error, warn};

use crate::{
    domain::repositories::locks::RecordLock,
    infra::db::postgres::postgres_connection::{PgPoolSquad, PgPooledConnection},
};

/// First wait between lock attempts; doubles up to `MAX_BACKOFF`.
const INITIAL_BACKOFF: Duration = Duration::from_millis(20);
const MAX_BACKOFF: Duration = Duration::from_millis(500);
/// Contended locks give up after this long.
const MAX_WAIT: Duration = Duration::from_secs(30);

#[derive(QueryableByName)]
struct TryLock {
    #[diesel(sql_type = Bool)]
    locked: bool,
}

/// A Postgres session advisory lock. The pooled connection that took it stays
/// checked out until the guard drops, so the lock lives exactly as long as the guard.
/// Waiters never hold a connection: they try, hand the connection back and sleep.
pub struct AdvisoryLockGuard {
    conn: Option<PgPooledConnection>,
    key: String,
}

impl AdvisoryLockGuard {
    pub async fn acquire(db_pool: Arc<PgPoolSquad>, key: String) -> Result<Self> {
        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempts = 0_u32;

        loop {
            attempts += 1;
            if let Some(conn) = try_lock(Arc::clone(&db_pool), key.clone()).await? {
                debug!(%key, attempts, "advisory_lock: acquired");
                return Ok(Self {
                    conn: Some(conn),
                    key,
                });
            }
            if started.elapsed() + backoff > MAX_WAIT {
                warn!(%key, attempts, "advisory_lock: gave up waiting");
                bail!("timed out waiting for advisory lock {key}");
            }
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff);
        }
    }

    pub fn into_record_lock(self) -> RecordLock {
        RecordLock::new(self)
    }
}

impl Drop for AdvisoryLockGuard {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        // Session locks survive on pooled connections; every lock this
        // connection holds must go before it is handed back.
        match sql_query("SELECT pg_advisory_unlock_all()").execute(&mut conn) {
            Ok(_) => debug!(key = %self.key, "advisory_lock: released"),
            Err(err) => error!(
                key = %self.key,
                db_error = ?err,
                "advisory_lock: failed to release lock"
            ),
        }
    }
}

/// One `pg_try_advisory_lock` round trip. The connection is kept only when the lock was taken.
async fn try_lock(db_pool: Arc<PgPoolSquad>, key: String) -> Result<Option<PgPooledConnection>> {
    tokio::task::spawn_blocking(move || -> Result<Option<PgPooledConnection>> {
        let mut conn = db_pool.get()?;
        let attempt = sql_query("SELECT pg_try_advisory_lock(hashtextextended($1, 0)) AS locked")
            .bind::<Text, _>(&key)
            .get_result::<TryLock>(&mut conn)?;
        Ok(attempt.locked.then_some(conn))
    })
    .await
    .map_err(|err| anyhow!("advisory lock task failed: {err}"))?
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

pub fn payment_lock_key(payment_id: uuid::Uuid) -> String {
    format!("payment:{payment_id}")
}

pub fn checkout_lock_key(checkout_token: uuid::Uuid) -> String {
    format!("checkout:{checkout_token}")
}
