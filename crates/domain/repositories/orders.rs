use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::domain::entities::{
    checkouts::CheckoutEntity, orders::OrderEntity, payments::PaymentEntity,
};

/// Checks that a paid checkout may become an order. `Err` carries the reason.
pub fn validate_order(checkout: &CheckoutEntity, payment: &PaymentEntity) -> Result<(), String> {
    if let Some(order_id) = checkout.completed_order_id {
        return Err(format!("checkout already completed as order {order_id}"));
    }
    if payment.checkout_token != Some(checkout.token) {
        return Err("payment does not belong to checkout".to_string());
    }
    if !payment.currency.eq_ignore_ascii_case(&checkout.currency) {
        return Err(format!(
            "payment currency {} differs from checkout currency {}",
            payment.currency, checkout.currency
        ));
    }
    if payment.total < checkout.total {
        return Err(format!(
            "payment total {} does not cover checkout total {}",
            payment.total, checkout.total
        ));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum OrderCreationError {
    #[error("order validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
#[automock]
pub trait OrderRepository {
    /// Turns a paid checkout into an order, marks the checkout completed and links
    /// the order to the payment, all in one step.
    async fn create_order(
        &self,
        checkout: CheckoutEntity,
        payment: PaymentEntity,
    ) -> Result<OrderEntity, OrderCreationError>;
}
