use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use tracing::info;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{checkouts, orders, payments},
    },
};
use domain::{
    entities::{
        checkouts::CheckoutEntity,
        orders::{InsertOrderEntity, OrderEntity},
        payments::PaymentEntity,
    },
    repositories::orders::{OrderCreationError, OrderRepository, validate_order},
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn create_order(
        &self,
        checkout: CheckoutEntity,
        payment: PaymentEntity,
    ) -> Result<OrderEntity, OrderCreationError> {
        let mut conn = Arc::clone(&self.db_pool).get().map_err(anyhow::Error::from)?;

        let outcome = conn.transaction::<Result<OrderEntity, String>, anyhow::Error, _>(|conn| {
            // Re-read under a row lock: the caller's copy may predate another completion.
            let current = checkouts::table
                .find(checkout.token)
                .select(CheckoutEntity::as_select())
                .for_update()
                .first::<CheckoutEntity>(conn)?;

            if let Err(reason) = validate_order(&current, &payment) {
                return Ok(Err(reason));
            }

            let order = insert_into(orders::table)
                .values(&InsertOrderEntity {
                    checkout_token: current.token,
                    total: current.total,
                    currency: current.currency.clone(),
                    customer_email: current.email.clone(),
                })
                .returning(OrderEntity::as_select())
                .get_result::<OrderEntity>(conn)?;

            update(checkouts::table.find(current.token))
                .set((
                    checkouts::completed_order_id.eq(Some(order.id)),
                    checkouts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            update(payments::table.find(payment.id))
                .set((
                    payments::order_id.eq(Some(order.id)),
                    payments::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(Ok(order))
        })?;

        match outcome {
            Ok(order) => {
                info!(
                    order_id = %order.id,
                    checkout_token = %order.checkout_token,
                    payment_id = %payment.id,
                    "orders: created order from checkout"
                );
                Ok(order)
            }
            Err(reason) => Err(OrderCreationError::Validation(reason)),
        }
    }
}
