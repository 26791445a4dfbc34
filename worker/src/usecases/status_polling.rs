use acquiring::{
    domain::{
        entities::jobs::JobEntity,
        repositories::{jobs::JobRepository, payments::PaymentRepository},
        value_objects::{
            enums::transaction_kinds::TransactionKind,
            gateway_statuses::OrderStatus,
            reconciliation::ReconciliationRequest,
            status_checks::StatusCheckPayload,
        },
    },
    gateway::{PaymentGateway, config::GatewayConfig, errors::GatewayError},
    usecases::{errors::PaymentFlowError, reconciliation::ReconciliationUseCase},
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::config_model::StatusPollingConfig;

/// What one status check learned about the order.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Settled,
    NotYet(String),
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    Done,
    Reschedule { run_at: DateTime<Utc>, reason: String },
    Dead { reason: String },
}

/// Retries run on a fixed backoff until the next attempt would land past
/// `created_at + time_limit`.
pub fn next_step(
    policy: &StatusPollingConfig,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    outcome: PollOutcome,
) -> PollStep {
    match outcome {
        PollOutcome::Settled => PollStep::Done,
        PollOutcome::Fatal(reason) => PollStep::Dead { reason },
        PollOutcome::NotYet(reason) => {
            let run_at = now + Duration::seconds(policy.backoff_secs as i64);
            let deadline = created_at + Duration::seconds(policy.time_limit_secs as i64);
            if run_at > deadline {
                PollStep::Dead {
                    reason: format!("status check time limit exceeded: {reason}"),
                }
            } else {
                PollStep::Reschedule { run_at, reason }
            }
        }
    }
}

/// Kind hint from `orderStatus`: 1 is a hold, 2 a completed charge.
pub fn kind_hint(status: &OrderStatus) -> Option<TransactionKind> {
    match status.order_status {
        Some(1) => Some(TransactionKind::Auth),
        Some(2) => Some(TransactionKind::Capture),
        _ => None,
    }
}

pub struct StatusPollingUseCase {
    job_repository: Arc<dyn JobRepository + Send + Sync>,
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    reconciliation: Arc<ReconciliationUseCase>,
    gateway_config: Arc<GatewayConfig>,
    policy: StatusPollingConfig,
}

impl StatusPollingUseCase {
    pub fn new(
        job_repository: Arc<dyn JobRepository + Send + Sync>,
        payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        reconciliation: Arc<ReconciliationUseCase>,
        gateway_config: Arc<GatewayConfig>,
        policy: StatusPollingConfig,
    ) -> Self {
        Self {
            job_repository,
            payment_repository,
            gateway,
            reconciliation,
            gateway_config,
            policy,
        }
    }

    /// Checks the order behind a claimed job and stores the job's next state.
    pub async fn process_job(&self, job: &JobEntity) -> Result<PollStep> {
        let outcome = match serde_json::from_value::<StatusCheckPayload>(job.payload.clone()) {
            Ok(payload) => self.check(job, payload).await,
            Err(err) => PollOutcome::Fatal(format!("malformed status check payload: {err}")),
        };

        let step = next_step(&self.policy, job.created_at, Utc::now(), outcome);
        match &step {
            PollStep::Done => {
                self.job_repository.mark_job_done(job.id).await?;
                info!(job_id = %job.id, attempts = job.attempts, "status_polling: order settled");
            }
            PollStep::Reschedule { run_at, reason } => {
                self.job_repository
                    .reschedule_job(job.id, *run_at, reason.clone())
                    .await?;
                info!(job_id = %job.id, %run_at, %reason, "status_polling: order not settled, rescheduled");
            }
            PollStep::Dead { reason } => {
                self.job_repository
                    .mark_job_dead(job.id, reason.clone())
                    .await?;
                error!(job_id = %job.id, attempts = job.attempts, %reason, "status_polling: job is dead");
            }
        }
        Ok(step)
    }

    async fn check(&self, job: &JobEntity, payload: StatusCheckPayload) -> PollOutcome {
        let token = payload.order_token;
        let status = match self.gateway.get_status(token.clone()).await {
            Ok(status) => status,
            Err(err @ GatewayError::Server { .. }) => {
                warn!(job_id = %job.id, gateway_error = %err, "status_polling: gateway unavailable");
                return PollOutcome::NotYet(err.to_string());
            }
            Err(err) => return PollOutcome::Fatal(err.to_string()),
        };

        if status.is_closed_unpaid() || status.is_known_failure() {
            return PollOutcome::Fatal(format!(
                "order closed without payment: orderStatus {}, {}",
                status
                    .order_status
                    .map_or_else(|| "missing".to_string(), |code| code.to_string()),
                status
                    .failure_message()
                    .unwrap_or_else(|| "no gateway message".to_string())
            ));
        }

        if !status.is_approved() {
            return PollOutcome::NotYet(format!(
                "action code {}",
                status
                    .action_code
                    .map_or_else(|| "missing".to_string(), |code| code.to_string())
            ));
        }

        let payment = match self
            .payment_repository
            .find_payment_by_token(token.clone(), self.gateway_config.gateway_name.clone())
            .await
        {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                let err = PaymentFlowError::DataConsistency(format!(
                    "no payment for gateway order {token} (job payment {})",
                    payload.payment_id
                ));
                return PollOutcome::Fatal(err.to_string());
            }
            Err(err) => return PollOutcome::NotYet(err.to_string()),
        };

        let hint = kind_hint(&status);
        match self
            .reconciliation
            .reconcile(ReconciliationRequest {
                payment_id: payment.id,
                status,
                expected_checkout: None,
                kind_hint: hint,
            })
            .await
        {
            Ok(result) if result.is_success => {
                info!(
                    job_id = %job.id,
                    payment_id = %payment.id,
                    kind = %result.kind,
                    already_processed = result.already_processed,
                    "status_polling: reconciled"
                );
                PollOutcome::Settled
            }
            Ok(result) => PollOutcome::Fatal(format!(
                "reconciliation of {} reported failure ({})",
                payment.id, result.kind
            )),
            Err(
                err @ (PaymentFlowError::NotFound(_)
                | PaymentFlowError::DataConsistency(_)
                | PaymentFlowError::BadRequest(_)),
            ) => PollOutcome::Fatal(err.to_string()),
            Err(err) => PollOutcome::NotYet(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquiring::{
        domain::value_objects::enums::{charge_statuses::ChargeStatus, job_statuses::JobStatus},
        gateway::MockPaymentGateway,
        infra::memory::{InMemoryStore, fixtures},
    };
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;

    fn policy() -> StatusPollingConfig {
        StatusPollingConfig::default()
    }

    fn usecase(store: &InMemoryStore, gateway: MockPaymentGateway) -> StatusPollingUseCase {
        let store = Arc::new(store.clone());
        let gateway: Arc<dyn PaymentGateway + Send + Sync> = Arc::new(gateway);
        let config = Arc::new(fixtures::gateway_config());
        let reconciliation = Arc::new(ReconciliationUseCase::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::clone(&gateway),
            Arc::clone(&config),
        ));
        StatusPollingUseCase::new(
            store.clone(),
            store,
            gateway,
            reconciliation,
            config,
            policy(),
        )
    }

    async fn claimed_job(store: &InMemoryStore, payment_id: uuid::Uuid) -> JobEntity {
        store
            .enqueue_status_check(StatusCheckPayload {
                order_token: fixtures::ORDER_TOKEN.to_string(),
                payment_id,
            })
            .await
            .unwrap();
        store
            .lock_next_status_check_job(policy().stale_before(Utc::now()))
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn not_yet_reschedules_within_time_limit() {
        let created_at = Utc::now();
        let now = created_at + Duration::seconds(300);

        let step = next_step(&policy(), created_at, now, PollOutcome::NotYet("pending".into()));

        assert_eq!(
            step,
            PollStep::Reschedule {
                run_at: now + Duration::seconds(60),
                reason: "pending".to_string(),
            }
        );
    }

    #[test]
    fn not_yet_past_time_limit_is_dead() {
        let created_at = Utc::now();
        let now = created_at + Duration::seconds(1150);

        let step = next_step(&policy(), created_at, now, PollOutcome::NotYet("pending".into()));

        assert!(matches!(step, PollStep::Dead { ref reason } if reason.contains("time limit")));
    }

    #[test]
    fn last_retry_may_land_on_the_deadline() {
        let created_at = Utc::now();
        let now = created_at + Duration::seconds(1140);

        let step = next_step(&policy(), created_at, now, PollOutcome::NotYet("pending".into()));

        assert!(matches!(step, PollStep::Reschedule { .. }));
    }

    #[test]
    fn maps_order_status_to_kind_hint() {
        assert_eq!(kind_hint(&fixtures::approved_status()), Some(TransactionKind::Capture));
        assert_eq!(kind_hint(&fixtures::pending_status()), None);
    }

    #[tokio::test]
    async fn approved_order_captures_and_finishes_job() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .with(eq(fixtures::ORDER_TOKEN.to_string()))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(fixtures::approved_status()) }));
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert_eq!(step, PollStep::Done);
        let stored = store.payment(payment.id).await.unwrap();
        assert_eq!(stored.charge_status(), ChargeStatus::FullyCharged);
        assert_eq!(stored.captured_amount, dec!(10.00));
        assert_eq!(store.jobs().await[0].status, JobStatus::Done.to_string());
    }

    #[tokio::test]
    async fn pending_order_is_rescheduled() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .returning(|_| Box::pin(async move { Ok(fixtures::pending_status()) }));
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(matches!(step, PollStep::Reschedule { .. }));
        let stored_job = &store.jobs().await[0];
        assert_eq!(stored_job.status, JobStatus::Queued.to_string());
        assert!(stored_job.run_at > Utc::now());
        assert!(store.transactions_of(payment.id).await.is_empty());
    }

    #[tokio::test]
    async fn declined_order_is_dead_on_first_check() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .times(1)
            .returning(|_| Box::pin(async move { Ok(fixtures::declined_status()) }));
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(
            matches!(step, PollStep::Dead { ref reason } if reason.contains("orderStatus 6"))
        );
        assert_eq!(store.jobs().await[0].status, JobStatus::Dead.to_string());
        assert!(store.transactions_of(payment.id).await.is_empty());
    }

    #[tokio::test]
    async fn documented_error_code_is_dead() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_get_status().times(1).returning(|_| {
            Box::pin(async move {
                Ok(OrderStatus::from_value(serde_json::json!({
                    "errorCode": "6",
                    "errorMessage": "Заказ не найден"
                })))
            })
        });
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(
            matches!(step, PollStep::Dead { ref reason } if reason.contains("Заказ не найден"))
        );
    }

    #[tokio::test]
    async fn reclaimed_job_past_time_limit_is_dead() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let two_hours_ago = Utc::now() - Duration::hours(2);
        store
            .insert_job(JobEntity {
                id: uuid::Uuid::new_v4(),
                type_: acquiring::domain::value_objects::status_checks::STATUS_CHECK_JOB_TYPE
                    .to_string(),
                payload: serde_json::to_value(StatusCheckPayload {
                    order_token: fixtures::ORDER_TOKEN.to_string(),
                    payment_id: payment.id,
                })
                .unwrap(),
                run_at: two_hours_ago,
                attempts: 1,
                locked_at: Some(two_hours_ago),
                locked_by: Some("crashed-worker".to_string()),
                error: None,
                status: JobStatus::Running.to_string(),
                created_at: two_hours_ago,
            })
            .await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .times(1)
            .returning(|_| Box::pin(async move { Ok(fixtures::pending_status()) }));
        let usecase = usecase(&store, gateway);

        let job = store
            .lock_next_status_check_job(policy().stale_before(Utc::now()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.attempts, 2);
        let step = usecase.process_job(&job).await.unwrap();

        assert!(matches!(step, PollStep::Dead { ref reason } if reason.contains("time limit")));
        assert_eq!(store.jobs().await[0].status, JobStatus::Dead.to_string());
    }

    #[test]
    fn lease_marks_older_locks_as_stale() {
        let now = Utc::now();
        assert_eq!(policy().stale_before(now), now - Duration::seconds(300));
    }

    #[tokio::test]
    async fn gateway_outage_is_retried() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .returning(|_| Box::pin(async move { Err(GatewayError::server("timeout")) }));
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(matches!(step, PollStep::Reschedule { .. }));
    }

    #[tokio::test]
    async fn gateway_rejection_kills_job() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_get_status().returning(|_| {
            Box::pin(async move {
                Err(GatewayError::Rejected {
                    code: "6".to_string(),
                    message: "unknown order".to_string(),
                })
            })
        });
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, payment.id).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(matches!(step, PollStep::Dead { .. }));
        assert_eq!(store.jobs().await[0].status, JobStatus::Dead.to_string());
    }

    #[tokio::test]
    async fn approved_order_without_payment_is_dead() {
        let store = InMemoryStore::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .returning(|_| Box::pin(async move { Ok(fixtures::approved_status()) }));
        let usecase = usecase(&store, gateway);
        let job = claimed_job(&store, uuid::Uuid::new_v4()).await;

        let step = usecase.process_job(&job).await.unwrap();

        assert!(
            matches!(step, PollStep::Dead { ref reason } if reason.contains("data consistency"))
        );
    }

    #[tokio::test]
    async fn already_settled_payment_still_finishes_job() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .times(2)
            .returning(|_| Box::pin(async move { Ok(fixtures::approved_status()) }));
        let usecase = usecase(&store, gateway);

        let first = claimed_job(&store, payment.id).await;
        usecase.process_job(&first).await.unwrap();
        let second = claimed_job(&store, payment.id).await;
        let step = usecase.process_job(&second).await.unwrap();

        assert_eq!(step, PollStep::Done);
        assert_eq!(store.transactions_of(payment.id).await.len(), 1);
        assert_eq!(store.orders().await.len(), 1);
    }
}
