use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{result_codes::ResultCode, transaction_kinds::TransactionKind},
    gateway_statuses::OrderStatus,
};

/// Column filter for `TransactionRepository::list_transactions`. `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub is_success: Option<bool>,
    pub action_required: Option<bool>,
}

impl TransactionFilter {
    /// Filter that finds an earlier successful, settled transaction of the same shape.
    pub fn already_processed(kind: TransactionKind, amount: Decimal, currency: &str) -> Self {
        Self {
            kind: Some(kind),
            amount: Some(amount),
            currency: Some(currency.to_string()),
            is_success: Some(true),
            action_required: Some(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationRequest {
    pub payment_id: Uuid,
    pub status: OrderStatus,
    /// Checkout the caller believes the payment belongs to. `None` skips the check.
    pub expected_checkout: Option<Uuid>,
    pub kind_hint: Option<TransactionKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub kind: TransactionKind,
    pub is_success: bool,
    pub token: String,
    pub already_processed: bool,
    pub order_id: Option<Uuid>,
    pub result_code: ResultCode,
}

impl ReconciliationResult {
    pub fn result_code_for(kind: TransactionKind, is_success: bool) -> ResultCode {
        match (is_success, kind) {
            (false, _) => ResultCode::Failed,
            (true, TransactionKind::Pending) => ResultCode::Pending,
            (true, _) => ResultCode::Success,
        }
    }
}
