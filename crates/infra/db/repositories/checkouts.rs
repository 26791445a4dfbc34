use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        advisory_lock::{AdvisoryLockGuard, checkout_lock_key},
        postgres_connection::PgPoolSquad,
        schema::checkouts,
    },
};
use domain::{
    entities::checkouts::CheckoutEntity,
    repositories::{checkouts::CheckoutRepository, locks::Locked},
};

pub struct CheckoutPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CheckoutPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CheckoutRepository for CheckoutPostgres {
    async fn lock_checkout(&self, checkout_token: Uuid) -> Result<Option<Locked<CheckoutEntity>>> {
        let guard = AdvisoryLockGuard::acquire(
            Arc::clone(&self.db_pool),
            checkout_lock_key(checkout_token),
        )
        .await?;

        let mut conn = Arc::clone(&self.db_pool).get()?;
        let checkout = checkouts::table
            .find(checkout_token)
            .select(CheckoutEntity::as_select())
            .first::<CheckoutEntity>(&mut conn)
            .optional()?;

        Ok(checkout.map(|checkout| Locked::new(checkout, guard.into_record_lock())))
    }
}
