use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::transaction_kinds::TransactionKind,
    infra::db::postgres::schema::transactions,
};

/// Ledger row. Never updated once written.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = transactions)]
pub struct TransactionEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub token: String,
    pub kind: String,
    pub is_success: bool,
    pub action_required: bool,
    pub amount: Decimal,
    pub currency: String,
    pub error: Option<String>,
    pub gateway_response: Value,
    pub created_at: DateTime<Utc>,
}

impl TransactionEntity {
    pub fn kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_str(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = transactions)]
pub struct InsertTransactionEntity {
    pub payment_id: Uuid,
    pub token: String,
    pub kind: String,
    pub is_success: bool,
    pub action_required: bool,
    pub amount: Decimal,
    pub currency: String,
    pub error: Option<String>,
    pub gateway_response: Value,
}

// NewTransactionEntity is the application-facing alias for inserting rows into `transactions`.
pub type NewTransactionEntity = InsertTransactionEntity;
