pub mod fixtures;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{
    entities::{
        checkouts::CheckoutEntity,
        jobs::JobEntity,
        orders::OrderEntity,
        payments::{PaymentEntity, UpdateChargeEntity},
        transactions::{NewTransactionEntity, TransactionEntity},
    },
    repositories::{
        checkouts::CheckoutRepository,
        jobs::JobRepository,
        locks::{Locked, RecordLock},
        orders::{OrderCreationError, OrderRepository, validate_order},
        payments::PaymentRepository,
        transactions::TransactionRepository,
    },
    value_objects::{
        enums::job_statuses::JobStatus,
        extra_data::ExtraDataLog,
        reconciliation::TransactionFilter,
        status_checks::{STATUS_CHECK_JOB_TYPE, StatusCheckPayload},
    },
};

#[derive(Default)]
struct Tables {
    payments: HashMap<Uuid, PaymentEntity>,
    transactions: Vec<TransactionEntity>,
    checkouts: HashMap<Uuid, CheckoutEntity>,
    orders: Vec<OrderEntity>,
    jobs: Vec<JobEntity>,
}

/// A thread-safe in-memory implementation of every store trait.
///
/// Record locks are per-key async mutexes, so two tasks locking the same payment
/// serialize exactly like two processes contending on a Postgres advisory lock.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    record_locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_payment(&self, payment: PaymentEntity) {
        self.tables.write().await.payments.insert(payment.id, payment);
    }

    pub async fn insert_checkout(&self, checkout: CheckoutEntity) {
        self.tables
            .write()
            .await
            .checkouts
            .insert(checkout.token, checkout);
    }

    pub async fn payment(&self, payment_id: Uuid) -> Option<PaymentEntity> {
        self.tables.read().await.payments.get(&payment_id).cloned()
    }

    pub async fn checkout(&self, token: Uuid) -> Option<CheckoutEntity> {
        self.tables.read().await.checkouts.get(&token).cloned()
    }

    pub async fn transactions_of(&self, payment_id: Uuid) -> Vec<TransactionEntity> {
        self.tables
            .read()
            .await
            .transactions
            .iter()
            .filter(|txn| txn.payment_id == payment_id)
            .cloned()
            .collect()
    }

    pub async fn orders(&self) -> Vec<OrderEntity> {
        self.tables.read().await.orders.clone()
    }

    pub async fn jobs(&self) -> Vec<JobEntity> {
        self.tables.read().await.jobs.clone()
    }

    pub async fn insert_job(&self, job: JobEntity) {
        self.tables.write().await.jobs.push(job);
    }

    async fn lock_key(&self, key: String) -> Result<RecordLock> {
        let mutex = {
            let mut locks = self
                .record_locks
                .lock()
                .map_err(|_| anyhow!("record lock table poisoned"))?;
            Arc::clone(locks.entry(key).or_default())
        };
        Ok(RecordLock::new(mutex.lock_owned().await))
    }

    async fn update_job<F>(&self, job_id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut JobEntity) + Send,
    {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| anyhow!("job {job_id} not found"))?;
        apply(job);
        job.locked_at = None;
        job.locked_by = None;
        Ok(())
    }

    async fn update_payment<F>(&self, payment_id: Uuid, apply: F) -> Result<()>
    where
        F: FnOnce(&mut PaymentEntity) + Send,
    {
        let mut tables = self.tables.write().await;
        let payment = tables
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| anyhow!("payment {payment_id} not found"))?;
        apply(payment);
        payment.updated_at = Utc::now();
        Ok(())
    }
}

fn push_snapshot(payment: &mut PaymentEntity, snapshot: Value) {
    let mut log = ExtraDataLog::from_value(payment.extra_data.take());
    log.push(snapshot);
    payment.extra_data = log.into_value();
}

fn matches_filter(txn: &TransactionEntity, filter: &TransactionFilter) -> bool {
    filter.kind.is_none_or(|kind| txn.kind == kind.as_str())
        && filter.amount.is_none_or(|amount| txn.amount == amount)
        && filter
            .currency
            .as_ref()
            .is_none_or(|currency| txn.currency == *currency)
        && filter.is_success.is_none_or(|flag| txn.is_success == flag)
        && filter
            .action_required
            .is_none_or(|flag| txn.action_required == flag)
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn find_active_payment(
        &self,
        payment_id: Uuid,
        gateway: String,
    ) -> Result<Option<PaymentEntity>> {
        Ok(self
            .payment(payment_id)
            .await
            .filter(|payment| payment.is_active && payment.gateway == gateway))
    }

    async fn find_payment_by_token(
        &self,
        token: String,
        gateway: String,
    ) -> Result<Option<PaymentEntity>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .filter(|payment| payment.gateway == gateway)
            .filter(|payment| payment.token.as_deref() == Some(token.as_str()))
            .max_by_key(|payment| payment.created_at)
            .cloned())
    }

    async fn lock_payment(&self, payment_id: Uuid) -> Result<Option<Locked<PaymentEntity>>> {
        let guard = self.lock_key(format!("payment:{payment_id}")).await?;
        Ok(self
            .payment(payment_id)
            .await
            .map(|payment| Locked::new(payment, guard)))
    }

    async fn set_token(&self, payment_id: Uuid, token: String, snapshot: Value) -> Result<()> {
        self.update_payment(payment_id, |payment| {
            payment.token = Some(token);
            push_snapshot(payment, snapshot);
        })
        .await
    }

    async fn append_extra_data(&self, payment_id: Uuid, snapshot: Value) -> Result<()> {
        self.update_payment(payment_id, |payment| push_snapshot(payment, snapshot))
            .await
    }

    async fn update_charge_status(
        &self,
        payment_id: Uuid,
        update: UpdateChargeEntity,
    ) -> Result<()> {
        self.update_payment(payment_id, |payment| {
            payment.charge_status = update.charge_status;
            payment.captured_amount = update.captured_amount;
        })
        .await
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn save_transaction(
        &self,
        transaction: NewTransactionEntity,
    ) -> Result<TransactionEntity> {
        let saved = TransactionEntity {
            id: Uuid::new_v4(),
            payment_id: transaction.payment_id,
            token: transaction.token,
            kind: transaction.kind,
            is_success: transaction.is_success,
            action_required: transaction.action_required,
            amount: transaction.amount,
            currency: transaction.currency,
            error: transaction.error,
            gateway_response: transaction.gateway_response,
            created_at: Utc::now(),
        };
        self.tables.write().await.transactions.push(saved.clone());
        Ok(saved)
    }

    async fn list_transactions(
        &self,
        payment_id: Uuid,
        filter: TransactionFilter,
    ) -> Result<Vec<TransactionEntity>> {
        Ok(self
            .transactions_of(payment_id)
            .await
            .into_iter()
            .filter(|txn| matches_filter(txn, &filter))
            .collect())
    }
}

#[async_trait]
impl CheckoutRepository for InMemoryStore {
    async fn lock_checkout(&self, checkout_token: Uuid) -> Result<Option<Locked<CheckoutEntity>>> {
        let guard = self.lock_key(format!("checkout:{checkout_token}")).await?;
        Ok(self
            .checkout(checkout_token)
            .await
            .map(|checkout| Locked::new(checkout, guard)))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(
        &self,
        checkout: CheckoutEntity,
        payment: PaymentEntity,
    ) -> Result<OrderEntity, OrderCreationError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        let current = tables
            .checkouts
            .get_mut(&checkout.token)
            .ok_or_else(|| anyhow!("checkout {} not found", checkout.token))?;
        let linked = tables
            .payments
            .get_mut(&payment.id)
            .ok_or_else(|| anyhow!("payment {} not found", payment.id))?;

        validate_order(current, &payment).map_err(OrderCreationError::Validation)?;

        let order = OrderEntity {
            id: Uuid::new_v4(),
            checkout_token: current.token,
            total: current.total,
            currency: current.currency.clone(),
            customer_email: current.email.clone(),
            created_at: Utc::now(),
        };
        current.completed_order_id = Some(order.id);
        current.updated_at = Utc::now();
        linked.order_id = Some(order.id);
        linked.updated_at = Utc::now();
        tables.orders.push(order.clone());

        Ok(order)
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn enqueue_status_check(&self, payload: StatusCheckPayload) -> Result<Uuid> {
        let now = Utc::now();
        let job = JobEntity {
            id: Uuid::new_v4(),
            type_: STATUS_CHECK_JOB_TYPE.to_string(),
            payload: serde_json::to_value(payload)?,
            run_at: now,
            attempts: 0,
            locked_at: None,
            locked_by: None,
            error: None,
            status: JobStatus::Queued.to_string(),
            created_at: now,
        };
        let job_id = job.id;
        self.tables.write().await.jobs.push(job);
        Ok(job_id)
    }

    async fn lock_next_status_check_job(
        &self,
        stale_before: DateTime<Utc>,
    ) -> Result<Option<JobEntity>> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let queued = JobStatus::Queued.to_string();
        let running = JobStatus::Running.to_string();

        let next = tables
            .jobs
            .iter_mut()
            .filter(|job| job.type_ == STATUS_CHECK_JOB_TYPE)
            .filter(|job| {
                (job.status == queued && job.run_at <= now)
                    || (job.status == running
                        && job.locked_at.is_some_and(|locked_at| locked_at < stale_before))
            })
            .min_by_key(|job| job.run_at);

        Ok(next.map(|job| {
            job.status = JobStatus::Running.to_string();
            job.attempts += 1;
            job.locked_at = Some(now);
            job.locked_by = Some("in-memory".to_string());
            job.clone()
        }))
    }

    async fn mark_job_done(&self, job_id: Uuid) -> Result<()> {
        self.update_job(job_id, |job| {
            job.status = JobStatus::Done.to_string();
            job.error = None;
        })
        .await
    }

    async fn reschedule_job(
        &self,
        job_id: Uuid,
        run_at: DateTime<Utc>,
        error: String,
    ) -> Result<()> {
        self.update_job(job_id, |job| {
            job.status = JobStatus::Queued.to_string();
            job.run_at = run_at;
            job.error = Some(error);
        })
        .await
    }

    async fn mark_job_dead(&self, job_id: Uuid, error: String) -> Result<()> {
        self.update_job(job_id, |job| {
            job.status = JobStatus::Dead.to_string();
            job.error = Some(error);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::enums::transaction_kinds::TransactionKind;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;

    fn payment() -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            gateway: "sberbank".to_string(),
            is_active: true,
            checkout_token: None,
            order_id: None,
            token: None,
            total: dec!(10.00),
            captured_amount: dec!(0),
            currency: "RUB".to_string(),
            charge_status: "not-charged".to_string(),
            customer_email: None,
            return_url: None,
            extra_data: Value::Null,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn payment_lock_serializes_holders() {
        let store = InMemoryStore::new();
        let payment = payment();
        let payment_id = payment.id;
        store.insert_payment(payment).await;

        let first = store.lock_payment(payment_id).await.unwrap().unwrap();

        let contender = {
            let store = store.clone();
            tokio::spawn(async move { store.lock_payment(payment_id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        let second = contender.await.unwrap().unwrap();
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn set_token_appends_snapshot() {
        let store = InMemoryStore::new();
        let payment = payment();
        let payment_id = payment.id;
        store.insert_payment(payment).await;

        store
            .set_token(payment_id, "abc".to_string(), json!({"orderId": "abc"}))
            .await
            .unwrap();
        store
            .append_extra_data(payment_id, json!({"actionCode": 0}))
            .await
            .unwrap();

        let stored = store.payment(payment_id).await.unwrap();
        assert_eq!(stored.token.as_deref(), Some("abc"));
        assert_eq!(
            stored.extra_data,
            json!([{"orderId": "abc"}, {"actionCode": 0}])
        );
        let found = store
            .find_payment_by_token("abc".to_string(), "sberbank".to_string())
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id), Some(payment_id));
    }

    #[tokio::test]
    async fn filters_transactions() {
        let store = InMemoryStore::new();
        let payment_id = Uuid::new_v4();
        for (kind, is_success) in [
            (TransactionKind::Capture, false),
            (TransactionKind::Capture, true),
            (TransactionKind::Auth, true),
        ] {
            store
                .save_transaction(NewTransactionEntity {
                    payment_id,
                    token: "abc".to_string(),
                    kind: kind.to_string(),
                    is_success,
                    action_required: false,
                    amount: dec!(10.00),
                    currency: "RUB".to_string(),
                    error: None,
                    gateway_response: json!({}),
                })
                .await
                .unwrap();
        }

        let matched = store
            .list_transactions(
                payment_id,
                TransactionFilter::already_processed(TransactionKind::Capture, dec!(10.00), "RUB"),
            )
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert!(matched[0].is_success);
    }

    fn lease_cutoff() -> DateTime<Utc> {
        Utc::now() - chrono::Duration::seconds(300)
    }

    fn running_job(locked_at: DateTime<Utc>) -> JobEntity {
        JobEntity {
            id: Uuid::new_v4(),
            type_: STATUS_CHECK_JOB_TYPE.to_string(),
            payload: json!({"order_token": "abc", "payment_id": Uuid::new_v4()}),
            run_at: locked_at,
            attempts: 1,
            locked_at: Some(locked_at),
            locked_by: Some("crashed-worker".to_string()),
            error: None,
            status: JobStatus::Running.to_string(),
            created_at: locked_at,
        }
    }

    #[tokio::test]
    async fn abandoned_running_job_is_reclaimed_after_lease() {
        let store = InMemoryStore::new();
        let fresh = running_job(Utc::now() - chrono::Duration::seconds(10));
        let abandoned = running_job(Utc::now() - chrono::Duration::hours(2));
        store.insert_job(fresh.clone()).await;
        store.insert_job(abandoned.clone()).await;

        let claimed = store
            .lock_next_status_check_job(lease_cutoff())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(claimed.id, abandoned.id);
        assert_eq!(claimed.attempts, 2);
        assert_eq!(claimed.locked_by.as_deref(), Some("in-memory"));
        assert!(claimed.locked_at.unwrap() > abandoned.locked_at.unwrap());
        assert!(
            store
                .lock_next_status_check_job(lease_cutoff())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let store = InMemoryStore::new();
        let job_id = store
            .enqueue_status_check(StatusCheckPayload {
                order_token: "abc".to_string(),
                payment_id: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let claimed = store
            .lock_next_status_check_job(lease_cutoff())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, job_id);
        assert_eq!(claimed.attempts, 1);
        assert!(
            store
                .lock_next_status_check_job(lease_cutoff())
                .await
                .unwrap()
                .is_none()
        );

        let later = Utc::now() + chrono::Duration::seconds(60);
        store
            .reschedule_job(job_id, later, "action code 151".to_string())
            .await
            .unwrap();
        assert!(
            store
                .lock_next_status_check_job(lease_cutoff())
                .await
                .unwrap()
                .is_none()
        );

        store.mark_job_dead(job_id, "ceiling".to_string()).await.unwrap();
        let jobs = store.jobs().await;
        assert_eq!(jobs[0].status, "dead");
        assert_eq!(jobs[0].locked_by, None);
    }
}
