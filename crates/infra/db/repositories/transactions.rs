use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::transactions},
};
use domain::{
    entities::transactions::{NewTransactionEntity, TransactionEntity},
    repositories::transactions::TransactionRepository,
    value_objects::reconciliation::TransactionFilter,
};

pub struct TransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TransactionRepository for TransactionPostgres {
    async fn save_transaction(
        &self,
        transaction: NewTransactionEntity,
    ) -> Result<TransactionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let saved = insert_into(transactions::table)
            .values(&transaction)
            .returning(TransactionEntity::as_select())
            .get_result::<TransactionEntity>(&mut conn)?;

        Ok(saved)
    }

    async fn list_transactions(
        &self,
        payment_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<Vec<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = transactions::table
            .filter(transactions::payment_id.eq(payment_id))
            .into_boxed();

        if let Some(kind) = filter.kind {
            query = query.filter(transactions::kind.eq(kind.as_str()));
        }
        if let Some(amount) = filter.amount {
            query = query.filter(transactions::amount.eq(amount));
        }
        if let Some(currency) = filter.currency {
            query = query.filter(transactions::currency.eq(currency));
        }
        if let Some(is_success) = filter.is_success {
            query = query.filter(transactions::is_success.eq(is_success));
        }
        if let Some(action_required) = filter.action_required {
            query = query.filter(transactions::action_required.eq(action_required));
        }

        let rows = query
            .order(transactions::created_at.asc())
            .select(TransactionEntity::as_select())
            .load::<TransactionEntity>(&mut conn)?;

        Ok(rows)
    }
}
