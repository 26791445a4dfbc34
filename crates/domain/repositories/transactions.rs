use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::transactions::{NewTransactionEntity, TransactionEntity},
    value_objects::reconciliation::TransactionFilter,
};

#[async_trait]
#[automock]
pub trait TransactionRepository {
    async fn save_transaction(&self, transaction: NewTransactionEntity)
    -> Result<TransactionEntity>;

    /// Matching transactions ordered by `created_at`, oldest first.
    async fn list_transactions(
        &self,
        payment_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<Vec<TransactionEntity>>;
}
