use acquiring::usecases::errors::PaymentFlowError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Flow(#[from] PaymentFlowError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Flow(err) => {
                let status = err.status_code();
                let message = match err {
                    PaymentFlowError::BadRequest(_) => "Bad request".to_string(),
                    PaymentFlowError::UnsupportedCurrency(currency) => {
                        format!("Currency {currency} is not supported")
                    }
                    PaymentFlowError::GatewayRejected { .. } => {
                        "Payment could not be performed".to_string()
                    }
                    PaymentFlowError::NotFound(_) => "Not found".to_string(),
                    PaymentFlowError::ServerError(_) => "Payment gateway unavailable".to_string(),
                    PaymentFlowError::DataConsistency(_) | PaymentFlowError::Internal(_) => {
                        "Internal server error".to_string()
                    }
                };
                (status, message)
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_text_is_not_exposed() {
        let err = AppError::from(PaymentFlowError::GatewayRejected {
            code: "5".to_string(),
            message: "Доступ запрещён userName=merchant".to_string(),
        });
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!message.contains("merchant"));
    }

    #[test]
    fn internal_errors_are_generic() {
        let err = AppError::from(anyhow::anyhow!("connection to 10.0.0.5 refused"));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
