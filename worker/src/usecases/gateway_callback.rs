use acquiring::{
    domain::{
        repositories::payments::PaymentRepository,
        value_objects::reconciliation::{ReconciliationRequest, ReconciliationResult},
    },
    gateway::{PaymentGateway, callback::verify_checksum, config::GatewayConfig},
    usecases::{
        errors::{PaymentFlowError, UseCaseResult},
        reconciliation::ReconciliationUseCase,
    },
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, warn};

use crate::usecases::status_polling::kind_hint;

const MD_ORDER_PARAM: &str = "mdOrder";

/// Handles the bank's server-to-server notification. Its fields are only a hint:
/// money state always comes from a fresh `get_status`.
pub struct GatewayCallbackUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    reconciliation: Arc<ReconciliationUseCase>,
    config: Arc<GatewayConfig>,
}

impl GatewayCallbackUseCase {
    pub fn new(
        payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        reconciliation: Arc<ReconciliationUseCase>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            payment_repository,
            gateway,
            reconciliation,
            config,
        }
    }

    pub async fn handle(&self, params: BTreeMap<String, String>) -> UseCaseResult<ReconciliationResult> {
        if let Some(secret) = &self.config.callback_secret {
            verify_checksum(secret, &params).map_err(|err| {
                warn!(error = %err, "gateway_callback: checksum rejected");
                PaymentFlowError::BadRequest("invalid checksum".to_string())
            })?;
        }

        let md_order = params
            .get(MD_ORDER_PARAM)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| PaymentFlowError::BadRequest("mdOrder is missing".to_string()))?;

        info!(
            %md_order,
            operation = ?params.get("operation"),
            status = ?params.get("status"),
            "gateway_callback: notification received"
        );

        let payment = self
            .payment_repository
            .find_payment_by_token(md_order.clone(), self.config.gateway_name.clone())
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(format!("gateway order {md_order}")))?;

        let status = self.gateway.get_status(md_order).await?;
        let hint = kind_hint(&status);

        let result = self
            .reconciliation
            .reconcile(ReconciliationRequest {
                payment_id: payment.id,
                status,
                expected_checkout: None,
                kind_hint: hint,
            })
            .await?;

        info!(
            payment_id = %payment.id,
            kind = %result.kind,
            is_success = result.is_success,
            already_processed = result.already_processed,
            "gateway_callback: reconciled"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquiring::{
        domain::value_objects::enums::charge_statuses::ChargeStatus,
        gateway::{MockPaymentGateway, callback::compute_checksum},
        infra::memory::{InMemoryStore, fixtures},
    };

    const SECRET: &str = "callback-secret";

    fn usecase(
        store: &InMemoryStore,
        gateway: MockPaymentGateway,
        secret: Option<&str>,
    ) -> GatewayCallbackUseCase {
        let store = Arc::new(store.clone());
        let gateway: Arc<dyn PaymentGateway + Send + Sync> = Arc::new(gateway);
        let mut config = fixtures::gateway_config();
        config.callback_secret = secret.map(str::to_string);
        let config = Arc::new(config);
        let reconciliation = Arc::new(ReconciliationUseCase::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::clone(&gateway),
            Arc::clone(&config),
        ));
        GatewayCallbackUseCase::new(store, gateway, reconciliation, config)
    }

    fn notification() -> BTreeMap<String, String> {
        BTreeMap::from([
            (MD_ORDER_PARAM.to_string(), fixtures::ORDER_TOKEN.to_string()),
            ("orderNumber".to_string(), "ignored".to_string()),
            ("operation".to_string(), "deposited".to_string()),
            ("status".to_string(), "1".to_string()),
        ])
    }

    fn signed(mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
        let checksum = compute_checksum(SECRET, &params).unwrap();
        params.insert("checksum".to_string(), checksum);
        params
    }

    fn approving_gateway() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_get_status()
            .times(1)
            .returning(|_| Box::pin(async move { Ok(fixtures::approved_status()) }));
        gateway
    }

    #[tokio::test]
    async fn signed_notification_reconciles_from_fresh_status() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let usecase = usecase(&store, approving_gateway(), Some(SECRET));

        let result = usecase.handle(signed(notification())).await.unwrap();

        assert!(result.is_success);
        assert_eq!(
            store.payment(payment.id).await.unwrap().charge_status(),
            ChargeStatus::FullyCharged
        );
    }

    #[tokio::test]
    async fn tampered_notification_is_rejected() {
        let (store, payment, _) = fixtures::seeded_store().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_get_status().times(0);
        let usecase = usecase(&store, gateway, Some(SECRET));

        let mut params = signed(notification());
        params.insert("status".to_string(), "0".to_string());

        let err = usecase.handle(params).await.unwrap_err();

        assert!(matches!(err, PaymentFlowError::BadRequest(_)));
        assert!(store.transactions_of(payment.id).await.is_empty());
    }

    #[tokio::test]
    async fn checksum_required_when_secret_configured() {
        let (store, _, _) = fixtures::seeded_store().await;
        let usecase = usecase(&store, MockPaymentGateway::new(), Some(SECRET));

        let err = usecase.handle(notification()).await.unwrap_err();

        assert!(matches!(err, PaymentFlowError::BadRequest(_)));
    }

    #[tokio::test]
    async fn unsigned_notification_accepted_without_secret() {
        let (store, _, _) = fixtures::seeded_store().await;
        let usecase = usecase(&store, approving_gateway(), None);

        let result = usecase.handle(notification()).await.unwrap();

        assert!(result.is_success);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let store = InMemoryStore::new();
        let usecase = usecase(&store, MockPaymentGateway::new(), None);

        let err = usecase.handle(notification()).await.unwrap_err();

        assert!(matches!(err, PaymentFlowError::NotFound(_)));
    }
}
