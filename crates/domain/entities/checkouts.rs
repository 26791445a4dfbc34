use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::infra::db::postgres::schema::checkouts;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = checkouts, primary_key(token))]
pub struct CheckoutEntity {
    pub token: Uuid,
    pub email: Option<String>,
    pub total: Decimal,
    pub currency: String,
    pub completed_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
