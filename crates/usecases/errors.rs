use http::StatusCode;
use thiserror::Error;

use crate::gateway::errors::GatewayError;

#[derive(Debug, Error)]
pub enum PaymentFlowError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("gateway rejected the request (code {code}): {message}")]
    GatewayRejected { code: String, message: String },
    #[error("gateway server error: {0}")]
    ServerError(String),
    #[error("currency {0} is not supported by the gateway")]
    UnsupportedCurrency(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("data consistency violation: {0}")]
    DataConsistency(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentFlowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentFlowError::BadRequest(_)
            | PaymentFlowError::GatewayRejected { .. }
            | PaymentFlowError::UnsupportedCurrency(_) => StatusCode::BAD_REQUEST,
            PaymentFlowError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentFlowError::ServerError(_) => StatusCode::BAD_GATEWAY,
            PaymentFlowError::DataConsistency(_) | PaymentFlowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn payment_not_found(payment_id: impl std::fmt::Display) -> Self {
        PaymentFlowError::NotFound(format!("payment {payment_id}"))
    }
}

impl From<GatewayError> for PaymentFlowError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::BadRequest { message } => PaymentFlowError::BadRequest(message),
            GatewayError::Rejected { code, message } => {
                PaymentFlowError::GatewayRejected { code, message }
            }
            GatewayError::Server { message } => PaymentFlowError::ServerError(message),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_gateway_errors_to_http_status() {
        let cases = [
            (
                GatewayError::BadRequest {
                    message: "amount".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Rejected {
                    code: "1".to_string(),
                    message: "duplicate".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (GatewayError::server("timeout"), StatusCode::BAD_GATEWAY),
        ];

        for (gateway_error, status) in cases {
            assert_eq!(PaymentFlowError::from(gateway_error).status_code(), status);
        }
    }

    #[test]
    fn internal_errors_are_500() {
        let err = PaymentFlowError::from(anyhow::anyhow!("pool exhausted"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            PaymentFlowError::DataConsistency("no payment for token".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
