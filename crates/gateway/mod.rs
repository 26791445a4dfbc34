pub mod callback;
pub mod config;
pub mod errors;
pub mod sberbank_client;

use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;

use crate::domain::value_objects::{
    gateway_statuses::OrderStatus,
    registration::{RegisterOrder, RegisteredOrder},
};
use errors::GatewayError;

/// Operations the acquiring gateway offers. `SberbankClient` is the production implementation.
#[async_trait]
#[automock]
pub trait PaymentGateway {
    async fn register(&self, order: RegisterOrder) -> Result<RegisteredOrder, GatewayError>;

    async fn get_status(&self, order_id: String) -> Result<OrderStatus, GatewayError>;

    /// Voids an order whose funds were only held.
    async fn reverse(&self, order_id: String) -> Result<Value, GatewayError>;

    async fn refund(&self, order_id: String, amount_minor: i64) -> Result<Value, GatewayError>;
}
