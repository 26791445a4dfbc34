use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            checkouts::CheckoutEntity,
            payments::{PaymentEntity, UpdateChargeEntity},
            transactions::NewTransactionEntity,
        },
        repositories::{
            checkouts::CheckoutRepository,
            orders::{OrderCreationError, OrderRepository},
            payments::PaymentRepository,
            transactions::TransactionRepository,
        },
        value_objects::{
            amounts::to_minor_units,
            enums::{
                charge_statuses::ChargeStatus, result_codes::ResultCode,
                transaction_kinds::TransactionKind,
            },
            gateway_statuses::OrderStatus,
            payment_states::PaymentState,
            reconciliation::{ReconciliationRequest, ReconciliationResult, TransactionFilter},
        },
    },
    gateway::{PaymentGateway, config::GatewayConfig},
    usecases::errors::{PaymentFlowError, UseCaseResult},
};

/// The single writer of payment money state. Every status observation, whatever
/// its source, goes through `reconcile` under the payment and checkout locks.
pub struct ReconciliationUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    transaction_repository: Arc<dyn TransactionRepository + Send + Sync>,
    checkout_repository: Arc<dyn CheckoutRepository + Send + Sync>,
    order_repository: Arc<dyn OrderRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    config: Arc<GatewayConfig>,
}

impl ReconciliationUseCase {
    pub fn new(
        payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
        transaction_repository: Arc<dyn TransactionRepository + Send + Sync>,
        checkout_repository: Arc<dyn CheckoutRepository + Send + Sync>,
        order_repository: Arc<dyn OrderRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            payment_repository,
            transaction_repository,
            checkout_repository,
            order_repository,
            gateway,
            config,
        }
    }

    pub async fn reconcile(
        &self,
        request: ReconciliationRequest,
    ) -> UseCaseResult<ReconciliationResult> {
        let payment_id = request.payment_id;

        // Lock order is always payment, then checkout.
        let (payment, _payment_lock) = self
            .payment_repository
            .lock_payment(payment_id)
            .await?
            .ok_or_else(|| PaymentFlowError::payment_not_found(payment_id))?
            .into_parts();

        if let Some(expected) = request.expected_checkout {
            if payment.checkout_token != Some(expected) {
                warn!(
                    %payment_id,
                    expected_checkout = %expected,
                    actual_checkout = ?payment.checkout_token,
                    "reconciliation: checkout mismatch"
                );
                return Err(PaymentFlowError::payment_not_found(payment_id));
            }
        }

        let (checkout, _checkout_lock) = match payment.checkout_token {
            Some(checkout_token) => {
                match self.checkout_repository.lock_checkout(checkout_token).await? {
                    Some(locked) => {
                        let (checkout, guard) = locked.into_parts();
                        (Some(checkout), Some(guard))
                    }
                    None => (None, None),
                }
            }
            None => (None, None),
        };

        let result = self.apply(&request, payment, checkout).await?;

        let state = self.payment_state(payment_id).await?;
        info!(
            %payment_id,
            payment_state = %state,
            result_code = %result.result_code,
            "reconciliation: finished"
        );
        Ok(result)
    }

    /// Lifecycle state derived from the payment's token and its ledger.
    pub async fn payment_state(&self, payment_id: Uuid) -> UseCaseResult<PaymentState> {
        let token = self
            .payment_repository
            .find_active_payment(payment_id, self.config.gateway_name.clone())
            .await?
            .and_then(|payment| payment.token);
        let transactions = self
            .transaction_repository
            .list_transactions(payment_id, TransactionFilter::default())
            .await?;
        Ok(PaymentState::derive(token.as_deref(), &transactions))
    }

    /// Runs with the payment and checkout locks held by `reconcile`.
    async fn apply(
        &self,
        request: &ReconciliationRequest,
        payment: PaymentEntity,
        checkout: Option<CheckoutEntity>,
    ) -> UseCaseResult<ReconciliationResult> {
        let payment_id = payment.id;
        let status = &request.status;
        let kind = self.select_kind(status, request.kind_hint);
        let is_success = outcome_is_success(status, kind);
        let token = payment
            .token
            .clone()
            .or_else(|| status.md_order.clone())
            .unwrap_or_default();

        if is_success {
            if let Some(existing_token) = self.already_processed(&payment, kind, &token).await? {
                // A previous run may have stopped after the ledger write; finish its steps.
                return self
                    .settle(payment, checkout, kind, existing_token, true)
                    .await;
            }
        }

        self.transaction_repository
            .save_transaction(NewTransactionEntity {
                payment_id,
                token: token.clone(),
                kind: kind.to_string(),
                is_success,
                action_required: false,
                amount: payment.total,
                currency: payment.currency.clone(),
                error: status.failure_message(),
                gateway_response: status.raw.clone(),
            })
            .await?;
        self.payment_repository
            .append_extra_data(payment_id, status.raw.clone())
            .await?;

        if !is_success {
            warn!(
                %payment_id,
                %kind,
                error_code = ?status.error_code,
                action_code = ?status.action_code,
                known_failure = status.is_known_failure(),
                "reconciliation: gateway reported failure"
            );
            return Ok(ReconciliationResult {
                kind,
                is_success: false,
                token,
                already_processed: false,
                order_id: payment.order_id,
                result_code: ResultCode::Failed,
            });
        }

        self.settle(payment, checkout, kind, token, false).await
    }

    /// Moves the charge status forward and turns the checkout into an order.
    /// Both steps are idempotent, so a duplicate observation re-runs them safely.
    async fn settle(
        &self,
        payment: PaymentEntity,
        checkout: Option<CheckoutEntity>,
        kind: TransactionKind,
        token: String,
        already_processed: bool,
    ) -> UseCaseResult<ReconciliationResult> {
        let payment_id = payment.id;
        let payment = self.advance_charge_status(payment, kind).await?;

        let mut order_id = payment.order_id;
        let order_eligible = order_id.is_none()
            && kind != TransactionKind::Pending
            && payment.charge_status().allows_order_creation();

        if let (true, Some(checkout)) = (order_eligible, checkout) {
            match self
                .order_repository
                .create_order(checkout, payment.clone())
                .await
            {
                Ok(order) => {
                    info!(%payment_id, order_id = %order.id, "reconciliation: order created");
                    order_id = Some(order.id);
                }
                Err(OrderCreationError::Validation(reason)) => {
                    warn!(%payment_id, %reason, "reconciliation: order rejected, returning funds");
                    self.refund_or_void(&payment, &token).await?;
                    return Ok(ReconciliationResult {
                        kind,
                        is_success: false,
                        token,
                        already_processed,
                        order_id: None,
                        result_code: ResultCode::Failed,
                    });
                }
                Err(OrderCreationError::Other(err)) => return Err(err.into()),
            }
        }

        if !already_processed {
            info!(%payment_id, %kind, order_id = ?order_id, "reconciliation: recorded successful transaction");
        }

        Ok(ReconciliationResult {
            kind,
            is_success: true,
            token,
            already_processed,
            order_id,
            result_code: ReconciliationResult::result_code_for(kind, true),
        })
    }

    fn select_kind(&self, status: &OrderStatus, hint: Option<TransactionKind>) -> TransactionKind {
        let pending = status
            .normalized_description()
            .is_some_and(|description| self.config.is_pending_description(&description));
        if pending {
            return TransactionKind::Pending;
        }
        hint.unwrap_or_else(|| self.config.default_kind())
    }

    /// Finds an earlier success this observation duplicates and returns its token.
    /// A fully charged or refunded payment has nothing left to capture, whatever
    /// kind the caller saw.
    async fn already_processed(
        &self,
        payment: &PaymentEntity,
        kind: TransactionKind,
        token: &str,
    ) -> UseCaseResult<Option<String>> {
        let filter = TransactionFilter::already_processed(kind, payment.total, &payment.currency);
        let mut matches = self
            .transaction_repository
            .list_transactions(payment.id, filter)
            .await?;

        let settled = kind != TransactionKind::Pending
            && matches!(
                payment.charge_status(),
                ChargeStatus::FullyCharged | ChargeStatus::Refunded
            );

        if matches.is_empty() && !settled {
            return Ok(None);
        }

        let existing_token = matches
            .pop()
            .map(|txn| txn.token)
            .filter(|existing| !existing.is_empty())
            .unwrap_or_else(|| token.to_string());

        info!(
            payment_id = %payment.id,
            %kind,
            charge_status = %payment.charge_status(),
            "reconciliation: already processed"
        );

        Ok(Some(existing_token))
    }

    async fn advance_charge_status(
        &self,
        mut payment: PaymentEntity,
        kind: TransactionKind,
    ) -> UseCaseResult<PaymentEntity> {
        let target = match kind {
            TransactionKind::Capture => ChargeStatus::FullyCharged,
            TransactionKind::Auth | TransactionKind::Pending => ChargeStatus::Pending,
            TransactionKind::ActionToConfirm if self.config.auto_capture => {
                ChargeStatus::FullyCharged
            }
            TransactionKind::ActionToConfirm => ChargeStatus::Pending,
            TransactionKind::Cancel => ChargeStatus::Cancelled,
            TransactionKind::Refund => ChargeStatus::Refunded,
        };

        let current = payment.charge_status();
        let next = current.advance(target);
        if next == current {
            if next != target {
                warn!(
                    payment_id = %payment.id,
                    %current,
                    %target,
                    "reconciliation: ignoring backward charge status move"
                );
            }
            return Ok(payment);
        }

        let captured_amount = if next == ChargeStatus::FullyCharged {
            payment.total
        } else {
            payment.captured_amount
        };
        self.store_charge(&mut payment, next, captured_amount).await?;
        Ok(payment)
    }

    async fn store_charge(
        &self,
        payment: &mut PaymentEntity,
        status: ChargeStatus,
        captured_amount: Decimal,
    ) -> UseCaseResult<()> {
        let update = UpdateChargeEntity {
            charge_status: status.to_string(),
            captured_amount,
            updated_at: Utc::now(),
        };
        self.payment_repository
            .update_charge_status(payment.id, update)
            .await?;
        payment.charge_status = status.to_string();
        payment.captured_amount = captured_amount;
        info!(payment_id = %payment.id, charge_status = %status, %captured_amount, "reconciliation: charge status updated");
        Ok(())
    }

    /// Gives the money back after an order could not be created: refund what was
    /// captured, otherwise void the hold.
    async fn refund_or_void(&self, payment: &PaymentEntity, token: &str) -> UseCaseResult<()> {
        let mut payment = payment.clone();
        let captured = payment.charge_status().is_captured();

        let (kind, outcome) = if captured {
            let amount_minor = to_minor_units(payment.captured_amount)?;
            (
                TransactionKind::Refund,
                self.gateway.refund(token.to_string(), amount_minor).await,
            )
        } else {
            (
                TransactionKind::Cancel,
                self.gateway.reverse(token.to_string()).await,
            )
        };

        let (is_success, error, response) = match outcome {
            Ok(raw) => (true, None, raw),
            Err(err) => {
                error!(
                    payment_id = %payment.id,
                    %kind,
                    gateway_error = ?err,
                    "reconciliation: could not return funds for rejected order"
                );
                (false, Some(err.to_string()), serde_json::Value::Null)
            }
        };

        self.transaction_repository
            .save_transaction(NewTransactionEntity {
                payment_id: payment.id,
                token: token.to_string(),
                kind: kind.to_string(),
                is_success,
                action_required: false,
                amount: if captured {
                    payment.captured_amount
                } else {
                    payment.total
                },
                currency: payment.currency.clone(),
                error,
                gateway_response: response.clone(),
            })
            .await?;

        if is_success {
            self.payment_repository
                .append_extra_data(payment.id, response)
                .await?;
            let next = if captured {
                ChargeStatus::Refunded
            } else {
                ChargeStatus::Cancelled
            };
            let captured_amount = if captured {
                Decimal::ZERO
            } else {
                payment.captured_amount
            };
            self.store_charge(&mut payment, next, captured_amount).await?;
        }
        Ok(())
    }
}

/// `errorCode` must be clean. Beyond that, a pending observation is a success
/// in itself; anything else also needs the bank's approval (`actionCode` 0 or absent).
fn outcome_is_success(status: &OrderStatus, kind: TransactionKind) -> bool {
    status.request_succeeded()
        && (kind == TransactionKind::Pending || status.action_code.is_none_or(|code| code == 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::repositories::{
            checkouts::MockCheckoutRepository, locks::Locked, orders::MockOrderRepository,
            payments::MockPaymentRepository, transactions::MockTransactionRepository,
        },
        gateway::{MockPaymentGateway, config::test_config},
        infra::memory::InMemoryStore,
    };
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn checkout() -> CheckoutEntity {
        CheckoutEntity {
            token: Uuid::new_v4(),
            email: Some("buyer@example.com".to_string()),
            total: dec!(10.00),
            currency: "RUB".to_string(),
            completed_order_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment_for(checkout: &CheckoutEntity) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            gateway: "sberbank".to_string(),
            is_active: true,
            checkout_token: Some(checkout.token),
            order_id: None,
            token: Some("abc".to_string()),
            total: dec!(10.00),
            captured_amount: dec!(0),
            currency: "RUB".to_string(),
            charge_status: ChargeStatus::NotCharged.to_string(),
            customer_email: checkout.email.clone(),
            return_url: Some("https://shop.example/checkout/result".to_string()),
            extra_data: json!([{"orderId": "abc", "formUrl": "https://pay.example/abc"}]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn approved() -> OrderStatus {
        OrderStatus::from_value(json!({
            "errorCode": "0",
            "errorMessage": "Успешно",
            "orderStatus": 2,
            "actionCode": 0,
            "actionCodeDescription": "",
            "amount": 1000,
            "currency": "643",
            "orderNumber": "ignored",
            "attributes": [{"name": "mdOrder", "value": "abc"}]
        }))
    }

    fn in_memory_usecase(
        store: &InMemoryStore,
        gateway: MockPaymentGateway,
    ) -> ReconciliationUseCase {
        let store = Arc::new(store.clone());
        ReconciliationUseCase::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            Arc::new(gateway),
            Arc::new(test_config()),
        )
    }

    async fn seeded_store() -> (InMemoryStore, PaymentEntity, CheckoutEntity) {
        let store = InMemoryStore::new();
        let checkout = checkout();
        let payment = payment_for(&checkout);
        store.insert_checkout(checkout.clone()).await;
        store.insert_payment(payment.clone()).await;
        (store, payment, checkout)
    }

    fn request(payment: &PaymentEntity, status: OrderStatus, hint: TransactionKind) -> ReconciliationRequest {
        ReconciliationRequest {
            payment_id: payment.id,
            status,
            expected_checkout: payment.checkout_token,
            kind_hint: Some(hint),
        }
    }

    #[tokio::test]
    async fn approved_capture_fully_charges_and_creates_order() {
        let (store, payment, checkout) = seeded_store().await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());

        let result = usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await
            .unwrap();

        assert!(result.is_success);
        assert!(!result.already_processed);
        assert_eq!(result.kind, TransactionKind::Capture);
        assert_eq!(result.token, "abc");
        assert_eq!(result.result_code, ResultCode::Success);

        let stored = store.payment(payment.id).await.unwrap();
        assert_eq!(stored.charge_status(), ChargeStatus::FullyCharged);
        assert_eq!(stored.captured_amount, dec!(10.00));
        assert_eq!(stored.order_id, result.order_id);
        assert_eq!(stored.extra_data_log().len(), 2);

        let ledger = store.transactions_of(payment.id).await;
        assert_eq!(ledger.len(), 1);
        assert!(ledger[0].is_success);
        assert_eq!(ledger[0].kind(), Some(TransactionKind::Capture));

        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].checkout_token, checkout.token);
        assert_eq!(
            store.checkout(checkout.token).await.unwrap().completed_order_id,
            Some(orders[0].id)
        );
    }

    #[tokio::test]
    async fn payment_state_follows_the_ledger() {
        let (store, payment, _) = seeded_store().await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());
        assert_eq!(
            usecase.payment_state(payment.id).await.unwrap(),
            PaymentState::Registered
        );

        usecase
            .reconcile(request(&payment, approved(), TransactionKind::ActionToConfirm))
            .await
            .unwrap();
        assert_eq!(
            usecase.payment_state(payment.id).await.unwrap(),
            PaymentState::ActionToConfirm
        );

        let (store, payment, _) = seeded_store().await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());
        usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await
            .unwrap();
        assert_eq!(
            usecase.payment_state(payment.id).await.unwrap(),
            PaymentState::Captured
        );
    }

    #[tokio::test]
    async fn concurrent_confirmations_record_once() {
        let (store, payment, _) = seeded_store().await;
        let usecase = Arc::new(in_memory_usecase(&store, MockPaymentGateway::new()));

        let from_poller = {
            let usecase = Arc::clone(&usecase);
            let request = request(&payment, approved(), TransactionKind::Capture);
            tokio::spawn(async move { usecase.reconcile(request).await })
        };
        let from_redirect = {
            let usecase = Arc::clone(&usecase);
            let request = request(&payment, approved(), TransactionKind::Capture);
            tokio::spawn(async move { usecase.reconcile(request).await })
        };

        let first = from_poller.await.unwrap().unwrap();
        let second = from_redirect.await.unwrap().unwrap();

        assert!(first.is_success && second.is_success);
        assert_eq!(
            [first.already_processed, second.already_processed]
                .iter()
                .filter(|processed| **processed)
                .count(),
            1
        );
        assert_eq!(first.token, second.token);
        assert_eq!(store.transactions_of(payment.id).await.len(), 1);
        assert_eq!(store.orders().await.len(), 1);
    }

    #[tokio::test]
    async fn confirmation_after_capture_is_already_processed() {
        let (store, payment, _) = seeded_store().await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());

        usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await
            .unwrap();
        let again = usecase
            .reconcile(request(&payment, approved(), TransactionKind::ActionToConfirm))
            .await
            .unwrap();

        assert!(again.already_processed);
        assert_eq!(again.token, "abc");
        assert_eq!(store.transactions_of(payment.id).await.len(), 1);
    }

    /// Payments over the in-memory store whose next `failures` charge updates fail.
    struct FlakyChargeUpdates {
        store: InMemoryStore,
        failures: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PaymentRepository for FlakyChargeUpdates {
        async fn find_active_payment(
            &self,
            payment_id: Uuid,
            gateway: String,
        ) -> anyhow::Result<Option<PaymentEntity>> {
            self.store.find_active_payment(payment_id, gateway).await
        }

        async fn find_payment_by_token(
            &self,
            token: String,
            gateway: String,
        ) -> anyhow::Result<Option<PaymentEntity>> {
            self.store.find_payment_by_token(token, gateway).await
        }

        async fn lock_payment(
            &self,
            payment_id: Uuid,
        ) -> anyhow::Result<Option<Locked<PaymentEntity>>> {
            self.store.lock_payment(payment_id).await
        }

        async fn set_token(&self, payment_id: Uuid, token: String, snapshot: Value) -> anyhow::Result<()> {
            self.store.set_token(payment_id, token, snapshot).await
        }

        async fn append_extra_data(&self, payment_id: Uuid, snapshot: Value) -> anyhow::Result<()> {
            self.store.append_extra_data(payment_id, snapshot).await
        }

        async fn update_charge_status(
            &self,
            payment_id: Uuid,
            update: UpdateChargeEntity,
        ) -> anyhow::Result<()> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                anyhow::bail!("connection reset while updating payment {payment_id}");
            }
            self.store.update_charge_status(payment_id, update).await
        }
    }

    #[tokio::test]
    async fn retry_after_interrupted_capture_finishes_charge_and_order() {
        let (store, payment, checkout) = seeded_store().await;
        let store_arc = Arc::new(store.clone());
        let usecase = ReconciliationUseCase::new(
            Arc::new(FlakyChargeUpdates {
                store: store.clone(),
                failures: AtomicUsize::new(1),
            }),
            store_arc.clone(),
            store_arc.clone(),
            store_arc,
            Arc::new(MockPaymentGateway::new()),
            Arc::new(test_config()),
        );

        let interrupted = usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await;
        assert!(interrupted.is_err());
        assert_eq!(store.transactions_of(payment.id).await.len(), 1);
        assert_eq!(
            store.payment(payment.id).await.unwrap().charge_status(),
            ChargeStatus::NotCharged
        );
        assert!(store.orders().await.is_empty());

        let retried = usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await
            .unwrap();

        assert!(retried.is_success);
        assert!(retried.already_processed);
        assert_eq!(retried.token, "abc");
        let stored = store.payment(payment.id).await.unwrap();
        assert_eq!(stored.charge_status(), ChargeStatus::FullyCharged);
        assert_eq!(stored.captured_amount, dec!(10.00));
        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(stored.order_id, Some(orders[0].id));
        assert_eq!(retried.order_id, Some(orders[0].id));
        assert_eq!(
            store.checkout(checkout.token).await.unwrap().completed_order_id,
            Some(orders[0].id)
        );
        assert_eq!(store.transactions_of(payment.id).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_of_charged_payment_without_order_creates_it() {
        let (store, mut payment, _) = seeded_store().await;
        payment.charge_status = ChargeStatus::FullyCharged.to_string();
        payment.captured_amount = payment.total;
        store.insert_payment(payment.clone()).await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());

        let result = usecase
            .reconcile(request(&payment, approved(), TransactionKind::ActionToConfirm))
            .await
            .unwrap();

        assert!(result.already_processed);
        assert!(store.transactions_of(payment.id).await.is_empty());
        let orders = store.orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(result.order_id, Some(orders[0].id));
        assert_eq!(store.payment(payment.id).await.unwrap().order_id, result.order_id);
    }

    #[tokio::test]
    async fn pending_observation_never_moves_fully_charged_back() {
        let (store, mut payment, _) = seeded_store().await;
        payment.charge_status = ChargeStatus::FullyCharged.to_string();
        payment.captured_amount = payment.total;
        payment.order_id = Some(Uuid::new_v4());
        store.insert_payment(payment.clone()).await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());

        let status = OrderStatus::from_value(json!({
            "errorCode": "0",
            "actionCode": -100,
            "actionCodeDescription": " Ожидание оплаты "
        }));
        let result = usecase
            .reconcile(request(&payment, status, TransactionKind::ActionToConfirm))
            .await
            .unwrap();

        assert_eq!(result.kind, TransactionKind::Pending);
        assert_eq!(result.result_code, ResultCode::Pending);
        let stored = store.payment(payment.id).await.unwrap();
        assert_eq!(stored.charge_status(), ChargeStatus::FullyCharged);
        assert_eq!(stored.captured_amount, dec!(10.00));
        assert!(store.orders().await.is_empty());
    }

    #[tokio::test]
    async fn declined_status_records_failed_transaction() {
        let (store, payment, _) = seeded_store().await;
        let usecase = in_memory_usecase(&store, MockPaymentGateway::new());

        let status = OrderStatus::from_value(json!({
            "errorCode": "0",
            "orderStatus": 6,
            "actionCode": 116,
            "actionCodeDescription": "Недостаточно средств"
        }));
        let result = usecase
            .reconcile(request(&payment, status, TransactionKind::ActionToConfirm))
            .await
            .unwrap();

        assert!(!result.is_success);
        assert_eq!(result.result_code, ResultCode::Failed);
        let ledger = store.transactions_of(payment.id).await;
        assert_eq!(ledger.len(), 1);
        assert!(!ledger[0].is_success);
        assert_eq!(ledger[0].error.as_deref(), Some("Недостаточно средств"));
        assert_eq!(
            store.payment(payment.id).await.unwrap().charge_status(),
            ChargeStatus::NotCharged
        );
    }

    #[tokio::test]
    async fn rejected_order_refunds_captured_funds() {
        let (store, payment, mut checkout) = seeded_store().await;
        checkout.completed_order_id = Some(Uuid::new_v4());
        store.insert_checkout(checkout).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_refund()
            .with(eq("abc".to_string()), eq(1000_i64))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(json!({"errorCode": "0"})) }));
        gateway.expect_reverse().times(0);
        let usecase = in_memory_usecase(&store, gateway);

        let result = usecase
            .reconcile(request(&payment, approved(), TransactionKind::Capture))
            .await
            .unwrap();

        assert!(!result.is_success);
        assert_eq!(result.result_code, ResultCode::Failed);
        assert_eq!(result.order_id, None);

        let stored = store.payment(payment.id).await.unwrap();
        assert_eq!(stored.charge_status(), ChargeStatus::Refunded);
        assert_eq!(stored.captured_amount, dec!(0));
        let kinds: Vec<_> = store
            .transactions_of(payment.id)
            .await
            .iter()
            .map(|txn| txn.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![Some(TransactionKind::Capture), Some(TransactionKind::Refund)]
        );
    }

    #[tokio::test]
    async fn rejected_order_on_held_funds_voids() {
        let (store, payment, mut checkout) = seeded_store().await;
        checkout.currency = "USD".to_string();
        store.insert_checkout(checkout).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_reverse()
            .with(eq("abc".to_string()))
            .times(1)
            .returning(|_| Box::pin(async { Ok(json!({"errorCode": 0})) }));
        let usecase = in_memory_usecase(&store, gateway);

        let result = usecase
            .reconcile(request(&payment, approved(), TransactionKind::Auth))
            .await
            .unwrap();

        assert!(!result.is_success);
        assert_eq!(
            store.payment(payment.id).await.unwrap().charge_status(),
            ChargeStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn checkout_mismatch_is_not_found_and_mutates_nothing() {
        let checkout = checkout();
        let payment = payment_for(&checkout);

        let mut payment_repository = MockPaymentRepository::new();
        let locked_payment = payment.clone();
        payment_repository
            .expect_lock_payment()
            .with(eq(payment.id))
            .times(1)
            .returning(move |_| {
                let payment = locked_payment.clone();
                Box::pin(async move { Ok(Some(Locked::unlocked(payment))) })
            });
        payment_repository.expect_append_extra_data().times(0);
        payment_repository.expect_update_charge_status().times(0);

        let mut transaction_repository = MockTransactionRepository::new();
        transaction_repository.expect_save_transaction().times(0);

        let usecase = ReconciliationUseCase::new(
            Arc::new(payment_repository),
            Arc::new(transaction_repository),
            Arc::new(MockCheckoutRepository::new()),
            Arc::new(MockOrderRepository::new()),
            Arc::new(MockPaymentGateway::new()),
            Arc::new(test_config()),
        );

        let err = usecase
            .reconcile(ReconciliationRequest {
                payment_id: payment.id,
                status: approved(),
                expected_checkout: Some(Uuid::new_v4()),
                kind_hint: Some(TransactionKind::ActionToConfirm),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentFlowError::NotFound(_)));
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let mut payment_repository = MockPaymentRepository::new();
        payment_repository
            .expect_lock_payment()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = ReconciliationUseCase::new(
            Arc::new(payment_repository),
            Arc::new(MockTransactionRepository::new()),
            Arc::new(MockCheckoutRepository::new()),
            Arc::new(MockOrderRepository::new()),
            Arc::new(MockPaymentGateway::new()),
            Arc::new(test_config()),
        );

        let err = usecase
            .reconcile(ReconciliationRequest {
                payment_id: Uuid::new_v4(),
                status: OrderStatus::from_value(Value::Null),
                expected_checkout: None,
                kind_hint: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentFlowError::NotFound(_)));
    }

    #[test]
    fn unknown_error_code_is_not_success() {
        let status = OrderStatus::from_value(json!({"errorCode": "42", "actionCode": 0}));
        assert!(!outcome_is_success(&status, TransactionKind::Capture));
        assert!(outcome_is_success(&approved(), TransactionKind::Capture));
    }
}
