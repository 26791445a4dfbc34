use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*, update};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        advisory_lock::{AdvisoryLockGuard, payment_lock_key},
        postgres_connection::PgPoolSquad,
        schema::payments,
    },
};
use domain::{
    entities::payments::{PaymentEntity, UpdateChargeEntity},
    repositories::{locks::Locked, payments::PaymentRepository},
    value_objects::extra_data::ExtraDataLog,
};

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .find(payment_id)
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    /// Appends to extra_data under a row lock so concurrent writers never drop a snapshot.
    fn append_snapshot(
        &self,
        payment_id: Uuid,
        token: Option<String>,
        snapshot: Value,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), anyhow::Error, _>(|conn| {
            let current = payments::table
                .find(payment_id)
                .select(payments::extra_data)
                .for_update()
                .first::<Value>(conn)?;

            let mut log = ExtraDataLog::from_value(current);
            log.push(snapshot);
            let now = Utc::now();

            match token {
                Some(token) => {
                    update(payments::table.find(payment_id))
                        .set((
                            payments::token.eq(Some(token)),
                            payments::extra_data.eq(log.into_value()),
                            payments::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }
                None => {
                    update(payments::table.find(payment_id))
                        .set((
                            payments::extra_data.eq(log.into_value()),
                            payments::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn find_active_payment(
        &self,
        payment_id: Uuid,
        gateway: String,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::id.eq(payment_id))
            .filter(payments::gateway.eq(gateway))
            .filter(payments::is_active.eq(true))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_payment_by_token(
        &self,
        token: String,
        gateway: String,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::token.eq(token))
            .filter(payments::gateway.eq(gateway))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn lock_payment(&self, payment_id: Uuid) -> Result<Option<Locked<PaymentEntity>>> {
        let guard =
            AdvisoryLockGuard::acquire(Arc::clone(&self.db_pool), payment_lock_key(payment_id))
                .await?;

        Ok(self
            .find_by_id(payment_id)?
            .map(|payment| Locked::new(payment, guard.into_record_lock())))
    }

    async fn set_token(&self, payment_id: Uuid, token: String, snapshot: Value) -> Result<()> {
        self.append_snapshot(payment_id, Some(token), snapshot)
    }

    async fn append_extra_data(&self, payment_id: Uuid, snapshot: Value) -> Result<()> {
        self.append_snapshot(payment_id, None, snapshot)
    }

    async fn update_charge_status(
        &self,
        payment_id: Uuid,
        update_entity: UpdateChargeEntity,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(payments::table.find(payment_id))
            .set(&update_entity)
            .execute(&mut conn)?;

        Ok(())
    }
}
