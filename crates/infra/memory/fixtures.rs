//! Seed records for exercising the flows against [`super::InMemoryStore`].

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{checkouts::CheckoutEntity, payments::PaymentEntity},
        value_objects::{
            currencies::DEFAULT_LOCALE, enums::charge_statuses::ChargeStatus,
            gateway_statuses::OrderStatus,
        },
    },
    gateway::config::{GatewayConfig, SBERBANK_GATEWAY},
};

use super::InMemoryStore;

pub const ORDER_TOKEN: &str = "abc";
pub const STOREFRONT_RETURN_URL: &str = "https://shop.example/checkout/result";

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        gateway_name: SBERBANK_GATEWAY.to_string(),
        login: "merchant-api".to_string(),
        password: "secret".to_string(),
        sandbox_mode: true,
        auto_capture: true,
        supported_currencies: vec!["RUB".to_string()],
        pending_statuses: vec!["ожидание оплаты".to_string()],
        callback_secret: None,
        base_url_override: None,
        timeout: Duration::from_secs(5),
        locale: DEFAULT_LOCALE.to_string(),
    }
}

/// A 10.00 RUB checkout.
pub fn checkout() -> CheckoutEntity {
    CheckoutEntity {
        token: Uuid::new_v4(),
        email: Some("buyer@example.com".to_string()),
        total: Decimal::new(1000, 2),
        currency: "RUB".to_string(),
        completed_order_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// An active, not yet registered payment covering `checkout`.
pub fn unregistered_payment(checkout: &CheckoutEntity) -> PaymentEntity {
    PaymentEntity {
        id: Uuid::new_v4(),
        gateway: SBERBANK_GATEWAY.to_string(),
        is_active: true,
        checkout_token: Some(checkout.token),
        order_id: None,
        token: None,
        total: checkout.total,
        captured_amount: Decimal::ZERO,
        currency: checkout.currency.clone(),
        charge_status: ChargeStatus::NotCharged.to_string(),
        customer_email: checkout.email.clone(),
        return_url: Some(STOREFRONT_RETURN_URL.to_string()),
        extra_data: Value::Array(Vec::new()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// The same payment after `register.do` returned [`ORDER_TOKEN`].
pub fn registered_payment(checkout: &CheckoutEntity) -> PaymentEntity {
    PaymentEntity {
        token: Some(ORDER_TOKEN.to_string()),
        extra_data: json!([{
            "orderId": ORDER_TOKEN,
            "formUrl": "https://3dsec.sberbank.ru/payment/merchants/pay.html?mdOrder=abc"
        }]),
        ..unregistered_payment(checkout)
    }
}

pub async fn seeded_store() -> (InMemoryStore, PaymentEntity, CheckoutEntity) {
    let store = InMemoryStore::new();
    let checkout = checkout();
    let payment = registered_payment(&checkout);
    store.insert_checkout(checkout.clone()).await;
    store.insert_payment(payment.clone()).await;
    (store, payment, checkout)
}

pub fn approved_status() -> OrderStatus {
    status_with(json!({
        "errorCode": "0",
        "errorMessage": "Успешно",
        "orderStatus": 2,
        "actionCode": 0,
        "actionCodeDescription": "",
        "amount": 1000,
        "currency": "643",
    }))
}

pub fn pending_status() -> OrderStatus {
    status_with(json!({
        "errorCode": "0",
        "orderStatus": 0,
        "actionCode": -100,
        "actionCodeDescription": "Ожидание оплаты",
        "amount": 1000,
        "currency": "643",
    }))
}

pub fn declined_status() -> OrderStatus {
    status_with(json!({
        "errorCode": "0",
        "orderStatus": 6,
        "actionCode": 2003,
        "actionCodeDescription": "Операция отклонена",
        "amount": 1000,
        "currency": "643",
    }))
}

fn status_with(mut raw: Value) -> OrderStatus {
    if let Value::Object(fields) = &mut raw {
        fields.insert(
            "attributes".to_string(),
            json!([{"name": "mdOrder", "value": ORDER_TOKEN}]),
        );
    }
    OrderStatus::from_value(raw)
}
