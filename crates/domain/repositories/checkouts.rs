use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{entities::checkouts::CheckoutEntity, repositories::locks::Locked};

#[async_trait]
#[automock]
pub trait CheckoutRepository {
    async fn lock_checkout(&self, checkout_token: Uuid) -> Result<Option<Locked<CheckoutEntity>>>;
}
