use async_trait::async_trait;
use reqwest::{StatusCode, header::ACCEPT};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    domain::value_objects::{
        gateway_statuses::{OrderStatus, string_field},
        registration::{RegisterOrder, RegisteredOrder},
    },
    gateway::{PaymentGateway, config::GatewayConfig, errors::GatewayError},
};

const REGISTER: &str = "register.do";
const ORDER_STATUS: &str = "getOrderStatusExtended.do";
const REVERSE: &str = "reverse.do";
const REFUND: &str = "refund.do";

/// Sberbank acquiring REST client built on reqwest. Holds no per-call state.
pub struct SberbankClient {
    http: reqwest::Client,
    base_url: String,
    login: String,
    password: String,
    locale: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    code: Option<Value>,
    description: Option<String>,
    message: Option<String>,
}

impl SberbankClient {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url(),
            login: config.login.clone(),
            password: config.password.clone(),
            locale: config.locale.clone(),
        })
    }

    async fn call(
        &self,
        method: &'static str,
        mut fields: Vec<(&'static str, String)>,
    ) -> Result<Value, GatewayError> {
        fields.push(("userName", self.login.clone()));
        fields.push(("password", self.password.clone()));
        fields.push(("locale", self.locale.clone()));

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, method))
            .header(ACCEPT, "application/json")
            .form(&fields)
            .send()
            .await
            .map_err(|err| {
                warn!(method, error = %err, "sberbank_client: transport failure");
                GatewayError::from(err)
            })?;

        let status = resp.status();
        let body = resp.text().await?;
        parse_response(method, status, &body)
    }
}

/// Turns an HTTP reply into a JSON object or a classified error.
pub(crate) fn parse_response(
    method: &str,
    status: StatusCode,
    body: &str,
) -> Result<Value, GatewayError> {
    if status.is_success() {
        return match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) => Ok(value),
            _ => {
                error!(method, %status, "sberbank_client: 2xx response is not a JSON object");
                Err(GatewayError::server("malformed gateway response"))
            }
        };
    }

    let err = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope.error.code.as_ref().map(|code| match code {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            let message = envelope
                .error
                .description
                .or(envelope.error.message)
                .unwrap_or_default();
            GatewayError::from_envelope(code.as_deref(), message)
        }
        Err(_) => GatewayError::server(format!("unexpected http status {status}")),
    };

    error!(
        method,
        %status,
        gateway_error = ?err,
        "sberbank_client: request failed"
    );
    Err(err)
}

fn non_zero_error_code(body: &Value) -> Option<String> {
    string_field(body, "errorCode").filter(|code| {
        let code = code.trim();
        !code.is_empty() && code != "0"
    })
}

fn rejection(body: &Value, code: String) -> GatewayError {
    GatewayError::Rejected {
        code,
        message: string_field(body, "errorMessage").unwrap_or_default(),
    }
}

pub(crate) fn interpret_register(body: Value) -> Result<RegisteredOrder, GatewayError> {
    if let Some(token) = string_field(&body, "orderId").filter(|id| !id.is_empty()) {
        let redirect_url = string_field(&body, "formUrl")
            .ok_or_else(|| GatewayError::server("register response has orderId but no formUrl"))?;
        return Ok(RegisteredOrder {
            token,
            redirect_url,
            raw: body,
        });
    }

    match non_zero_error_code(&body) {
        Some(code) => Err(rejection(&body, code)),
        None => Err(GatewayError::server(
            "register response has neither orderId nor errorCode",
        )),
    }
}

pub(crate) fn interpret_operation(body: Value) -> Result<Value, GatewayError> {
    match non_zero_error_code(&body) {
        Some(code) => Err(rejection(&body, code)),
        None => Ok(body),
    }
}

#[async_trait]
impl PaymentGateway for SberbankClient {
    async fn register(&self, order: RegisterOrder) -> Result<RegisteredOrder, GatewayError> {
        let mut fields = vec![
            ("orderNumber", order.order_number),
            ("amount", order.amount_minor.to_string()),
            ("returnUrl", order.return_url),
            ("language", self.locale.clone()),
        ];
        if let Some(currency) = order.currency_numeric {
            fields.push(("currency", currency.to_string()));
        }
        if let Some(email) = order.email {
            fields.push(("email", email));
        }

        let body = self.call(REGISTER, fields).await?;
        interpret_register(body)
    }

    async fn get_status(&self, order_id: String) -> Result<OrderStatus, GatewayError> {
        let body = self.call(ORDER_STATUS, vec![("orderId", order_id)]).await?;
        Ok(OrderStatus::from_value(body))
    }

    async fn reverse(&self, order_id: String) -> Result<Value, GatewayError> {
        let body = self.call(REVERSE, vec![("orderId", order_id)]).await?;
        interpret_operation(body)
    }

    async fn refund(&self, order_id: String, amount_minor: i64) -> Result<Value, GatewayError> {
        let body = self
            .call(
                REFUND,
                vec![("orderId", order_id), ("amount", amount_minor.to_string())],
            )
            .await?;
        interpret_operation(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_success_carries_token_and_form_url() {
        let registered = interpret_register(json!({
            "orderId": "abc",
            "formUrl": "https://3dsec.sberbank.ru/payment/merchants/test/payment_ru.html?mdOrder=abc"
        }))
        .unwrap();

        assert_eq!(registered.token, "abc");
        assert!(registered.redirect_url.ends_with("mdOrder=abc"));
    }

    #[test]
    fn register_error_code_on_2xx_is_rejection() {
        let err = interpret_register(json!({"errorCode": "1", "errorMessage": "duplicate order"}))
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::Rejected {
                code: "1".to_string(),
                message: "duplicate order".to_string()
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn register_without_order_id_or_code_is_server_error() {
        let err = interpret_register(json!({"errorCode": "0"})).unwrap_err();
        assert!(matches!(err, GatewayError::Server { .. }));
    }

    #[test]
    fn classifies_error_envelopes() {
        let bad = parse_response(
            REGISTER,
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"bad_request_error","description":"amount is missing"}}"#,
        )
        .unwrap_err();
        assert_eq!(
            bad,
            GatewayError::BadRequest {
                message: "amount is missing".to_string()
            }
        );

        let gateway = parse_response(
            REGISTER,
            StatusCode::BAD_GATEWAY,
            r#"{"error":{"code":"GATEWAY_ERROR","description":"declined"}}"#,
        )
        .unwrap_err();
        assert!(matches!(gateway, GatewayError::Rejected { .. }));

        let unknown = parse_response(
            REGISTER,
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":{"code":"SOMETHING_ELSE"}}"#,
        )
        .unwrap_err();
        assert!(unknown.is_retryable());

        let html = parse_response(REGISTER, StatusCode::SERVICE_UNAVAILABLE, "<html>")
            .unwrap_err();
        assert!(html.is_retryable());
    }

    #[test]
    fn non_object_2xx_body_is_server_error() {
        let err = parse_response(ORDER_STATUS, StatusCode::OK, "[]").unwrap_err();
        assert!(matches!(err, GatewayError::Server { .. }));
    }

    #[test]
    fn refund_rejection_is_surfaced() {
        let err = interpret_operation(json!({"errorCode": 7, "errorMessage": "refund denied"}))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { ref code, .. } if code == "7"));
        assert!(interpret_operation(json!({"errorCode": "0"})).is_ok());
    }
}
