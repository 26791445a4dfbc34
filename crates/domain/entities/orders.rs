use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::orders;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub checkout_token: Uuid,
    pub total: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub checkout_token: Uuid,
    pub total: Decimal,
    pub currency: String,
    pub customer_email: Option<String>,
}
