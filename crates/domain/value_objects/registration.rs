use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity,
    value_objects::enums::{result_codes::ResultCode, transaction_kinds::TransactionKind},
};

/// Snapshot of the fields registration needs from a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub payment_id: Uuid,
    pub checkout_token: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
}

impl From<&PaymentEntity> for PaymentInfo {
    fn from(payment: &PaymentEntity) -> Self {
        Self {
            payment_id: payment.id,
            checkout_token: payment.checkout_token,
            amount: payment.total,
            currency: payment.currency.clone(),
            customer_email: payment.customer_email.clone(),
        }
    }
}

/// Fields sent to `register.do` besides credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterOrder {
    pub order_number: String,
    pub amount_minor: i64,
    pub currency_numeric: Option<u16>,
    pub return_url: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredOrder {
    pub token: String,
    pub redirect_url: String,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationResult {
    pub redirect_required: bool,
    pub redirect_url: Option<String>,
    pub token: Option<String>,
    pub kind: TransactionKind,
    pub result_code: ResultCode,
    /// Verbatim gateway text for logs. Never sent to the customer.
    #[serde(skip)]
    pub gateway_message: Option<String>,
}

impl RegistrationResult {
    pub fn redirect(redirect_url: String, token: String, kind: TransactionKind) -> Self {
        Self {
            redirect_required: true,
            redirect_url: Some(redirect_url),
            token: Some(token),
            kind,
            result_code: ResultCode::Pending,
            gateway_message: None,
        }
    }

    pub fn failed(kind: TransactionKind, gateway_message: Option<String>) -> Self {
        Self {
            redirect_required: false,
            redirect_url: None,
            token: None,
            kind,
            result_code: ResultCode::Failed,
            gateway_message,
        }
    }
}
