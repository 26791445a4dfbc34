use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::value_objects::{enums::charge_statuses::ChargeStatus, extra_data::ExtraDataLog},
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub gateway: String,
    pub is_active: bool,
    pub checkout_token: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub token: Option<String>,
    pub total: Decimal,
    pub captured_amount: Decimal,
    pub currency: String,
    pub charge_status: String,
    pub customer_email: Option<String>,
    pub return_url: Option<String>,
    pub extra_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    /// Unknown stored values are treated as `not-charged` so they can only move forward.
    pub fn charge_status(&self) -> ChargeStatus {
        ChargeStatus::from_str(&self.charge_status).unwrap_or(ChargeStatus::NotCharged)
    }

    pub fn extra_data_log(&self) -> ExtraDataLog {
        ExtraDataLog::from_value(self.extra_data.clone())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub gateway: String,
    pub is_active: bool,
    pub checkout_token: Option<Uuid>,
    pub total: Decimal,
    pub captured_amount: Decimal,
    pub currency: String,
    pub charge_status: String,
    pub customer_email: Option<String>,
    pub return_url: Option<String>,
    pub extra_data: Value,
}

#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
pub struct UpdateChargeEntity {
    pub charge_status: String,
    pub captured_amount: Decimal,
    pub updated_at: DateTime<Utc>,
}
