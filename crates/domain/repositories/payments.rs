use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{PaymentEntity, UpdateChargeEntity},
    repositories::locks::Locked,
};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn find_active_payment(
        &self,
        payment_id: Uuid,
        gateway: String,
    ) -> Result<Option<PaymentEntity>>;

    async fn find_payment_by_token(
        &self,
        token: String,
        gateway: String,
    ) -> Result<Option<PaymentEntity>>;

    /// Takes the payment's exclusive lock, then reads it.
    async fn lock_payment(&self, payment_id: Uuid) -> Result<Option<Locked<PaymentEntity>>>;

    /// Stores the gateway order id and appends the registration response to extra_data.
    async fn set_token(&self, payment_id: Uuid, token: String, snapshot: Value) -> Result<()>;

    async fn append_extra_data(&self, payment_id: Uuid, snapshot: Value) -> Result<()>;

    async fn update_charge_status(
        &self,
        payment_id: Uuid,
        update: UpdateChargeEntity,
    ) -> Result<()>;
}
