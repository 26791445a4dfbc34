use acquiring::{
    domain::{
        repositories::{jobs::JobRepository, payments::PaymentRepository},
        value_objects::{
            amounts::to_minor_units,
            currencies::numeric_code,
            global_ids::encode_payment,
            registration::{PaymentInfo, RegisterOrder, RegistrationResult},
            status_checks::StatusCheckPayload,
        },
    },
    gateway::{PaymentGateway, config::GatewayConfig, errors::GatewayError},
    usecases::errors::{PaymentFlowError, UseCaseResult},
};
use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

pub const CONFIRMATION_PATH: &str = "sberbank/additional-actions";
const GENERIC_FAILURE: &str = "payment could not be performed";

pub struct RegistrationUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    job_repository: Arc<dyn JobRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    config: Arc<GatewayConfig>,
    public_base_url: Url,
}

impl RegistrationUseCase {
    pub fn new(
        payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
        job_repository: Arc<dyn JobRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway + Send + Sync>,
        config: Arc<GatewayConfig>,
        public_base_url: Url,
    ) -> Self {
        Self {
            payment_repository,
            job_repository,
            gateway,
            config,
            public_base_url,
        }
    }

    /// Registers the payment with the gateway and returns where to send the customer.
    ///
    /// No ledger row is written here: the payment only carries the gateway token,
    /// and a status-check job is queued so an abandoned redirect still settles.
    pub async fn register_payment(&self, payment_id: Uuid) -> UseCaseResult<RegistrationResult> {
        let payment = self
            .payment_repository
            .find_active_payment(payment_id, self.config.gateway_name.clone())
            .await?
            .ok_or_else(|| PaymentFlowError::payment_not_found(payment_id))?;
        let info = PaymentInfo::from(&payment);

        if !self.config.supports_currency(&info.currency) {
            warn!(%payment_id, currency = %info.currency, "registration: unsupported currency");
            return Err(PaymentFlowError::UnsupportedCurrency(info.currency));
        }

        let kind = self.config.default_kind();
        let order = RegisterOrder {
            order_number: payment_id.to_string(),
            amount_minor: to_minor_units(info.amount)?,
            currency_numeric: numeric_code(&info.currency),
            return_url: self.return_url(&info)?,
            email: info.customer_email.clone(),
        };

        info!(
            %payment_id,
            amount_minor = order.amount_minor,
            currency = %info.currency,
            %kind,
            "registration: registering order"
        );

        match self.gateway.register(order).await {
            Ok(registered) => {
                self.payment_repository
                    .set_token(payment_id, registered.token.clone(), registered.raw)
                    .await?;
                // Without the job, settlement is left to the redirect and the callback.
                match self
                    .job_repository
                    .enqueue_status_check(StatusCheckPayload {
                        order_token: registered.token.clone(),
                        payment_id,
                    })
                    .await
                {
                    Ok(job_id) => {
                        info!(%payment_id, %job_id, token = %registered.token, "registration: order registered");
                    }
                    Err(err) => {
                        error!(
                            %payment_id,
                            token = %registered.token,
                            error = ?err,
                            "registration: could not queue status check"
                        );
                    }
                }
                Ok(RegistrationResult::redirect(
                    registered.redirect_url,
                    registered.token,
                    kind,
                ))
            }
            Err(GatewayError::Rejected { code, message }) => {
                error!(%payment_id, %code, %message, "registration: gateway rejected order");
                Ok(RegistrationResult::failed(kind, Some(message)))
            }
            Err(err) => {
                error!(%payment_id, gateway_error = %err, "registration: gateway call failed");
                Ok(RegistrationResult::failed(
                    kind,
                    Some(GENERIC_FAILURE.to_string()),
                ))
            }
        }
    }

    fn return_url(&self, info: &PaymentInfo) -> UseCaseResult<String> {
        let mut url = self
            .public_base_url
            .join(CONFIRMATION_PATH)
            .context("public base url cannot hold the confirmation path")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("payment", &encode_payment(info.payment_id));
            if let Some(checkout_token) = info.checkout_token {
                query.append_pair("checkout", &checkout_token.to_string());
            }
        }
        Ok(url.to_string())
    }
}
