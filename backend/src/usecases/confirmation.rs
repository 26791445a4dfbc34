use acquiring::{
    domain::{
        repositories::payments::PaymentRepository,
        value_objects::{
            enums::transaction_kinds::TransactionKind,
            global_ids::{decode, decode_payment, encode_checkout, encode_payment, CHECKOUT_TYPE},
            reconciliation::{ReconciliationRequest, ReconciliationResult},
        },
    },
    gateway::{PaymentGateway, config::GatewayConfig},
    usecases::{
        errors::{PaymentFlowError, UseCaseResult},
        reconciliation::ReconciliationUseCase,
    },
};
use anyhow::Context;
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

const PAYMENT_PARAM: &str = "payment";
const CHECKOUT_PARAM: &str = "checkout";
const ORDER_ID_PARAM: &str = "orderId";

/// What the customer's browser brought back from the gateway.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationRequest {
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRedirect {
    pub location: String,
    pub result: ReconciliationResult,
}

pub struct ConfirmationUseCase {
    payment_repository: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway + Send + Sync>,
    reconciliation: Arc<ReconciliationUseCase>,
    config: Arc<GatewayConfig>,
}

impl ConfirmationUseCase {
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

    pub async fn confirm(&self, request: ConfirmationRequest) -> UseCaseResult<ConfirmationRedirect> {
        let payment_gid = request
            .query
            .get(PAYMENT_PARAM)
            .ok_or_else(|| PaymentFlowError::NotFound("payment".to_string()))?;
        let payment_id = decode_payment(payment_gid).map_err(|err| {
            warn!(gateway_error = %err, "confirmation: malformed payment id");
            PaymentFlowError::NotFound("payment".to_string())
        })?;

        let payment = self
            .payment_repository
            .find_active_payment(payment_id, self.config.gateway_name.clone())
            .await?
            .ok_or_else(|| PaymentFlowError::payment_not_found(payment_id))?;

        let checkout_token = request
            .query
            .get(CHECKOUT_PARAM)
            .and_then(|gid| decode_checkout(gid))
            .ok_or_else(|| PaymentFlowError::NotFound("checkout".to_string()))?;
        if payment.checkout_token != Some(checkout_token) {
            warn!(%payment_id, %checkout_token, "confirmation: payment does not belong to checkout");
            return Err(PaymentFlowError::payment_not_found(payment_id));
        }

        let return_url = payment
            .return_url
            .clone()
            .ok_or_else(|| PaymentFlowError::NotFound("return url".to_string()))?;

        let params = gateway_params(&request)?;
        let order_id = params
            .get(ORDER_ID_PARAM)
            .ok_or_else(|| PaymentFlowError::BadRequest("orderId is missing".to_string()))?;
        let expected = payment
            .token
            .clone()
            .or_else(|| payment.extra_data_log().latest_field(ORDER_ID_PARAM));
        if expected.as_deref() != Some(order_id.as_str()) {
            warn!(%payment_id, %order_id, "confirmation: orderId does not match payment");
            return Err(PaymentFlowError::BadRequest(
                "orderId does not match the payment".to_string(),
            ));
        }

        let status = self
            .gateway
            .get_status(order_id.clone())
            .await
            .map_err(|err| PaymentFlowError::BadRequest(err.to_string()))?;

        let result = self
            .reconciliation
            .reconcile(ReconciliationRequest {
                payment_id,
                status,
                expected_checkout: Some(checkout_token),
                kind_hint: Some(TransactionKind::ActionToConfirm),
            })
            .await?;

        let location = storefront_location(&return_url, checkout_token, payment_id, &result)?;
        info!(
            %payment_id,
            kind = %result.kind,
            result_code = %result.result_code,
            already_processed = result.already_processed,
            "confirmation: redirecting customer"
        );

        Ok(ConfirmationRedirect { location, result })
    }
}

/// The return URL carries the raw checkout token; storefront links may carry its global id.
fn decode_checkout(value: &str) -> Option<Uuid> {
    if let Ok(token) = Uuid::parse_str(value) {
        return Some(token);
    }
    match decode(value).ok()? {
        (type_name, id) if type_name == CHECKOUT_TYPE => Uuid::parse_str(&id).ok(),
        _ => None,
    }
}

/// Gateway parameters arrive either all in the query string or all in the form body.
fn gateway_params(request: &ConfirmationRequest) -> UseCaseResult<HashMap<String, String>> {
    let from_query: HashMap<String, String> = request
        .query
        .iter()
        .filter(|(key, _)| key.as_str() != PAYMENT_PARAM && key.as_str() != CHECKOUT_PARAM)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    match (from_query.is_empty(), request.form.is_empty()) {
        (false, true) => Ok(from_query),
        (true, false) => Ok(request.form.clone()),
        (true, true) => Err(PaymentFlowError::BadRequest(
            "no gateway parameters".to_string(),
        )),
        (false, false) => Err(PaymentFlowError::BadRequest(
            "gateway parameters split between query and body".to_string(),
        )),
    }
}

fn storefront_location(
    return_url: &str,
    checkout_token: Uuid,
    payment_id: Uuid,
    result: &ReconciliationResult,
) -> UseCaseResult<String> {
    let mut url = Url::parse(return_url).context("stored return url is invalid")?;
    url.query_pairs_mut()
        .append_pair(CHECKOUT_PARAM, &encode_checkout(checkout_token))
        .append_pair(PAYMENT_PARAM, &encode_payment(payment_id))
        .append_pair("resultCode", result.result_code.as_str());
    Ok(url.to_string())
}
