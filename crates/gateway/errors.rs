use thiserror::Error;

pub const BAD_REQUEST_ERROR: &str = "BAD_REQUEST_ERROR";
pub const GATEWAY_ERROR: &str = "GATEWAY_ERROR";
pub const SERVER_ERROR: &str = "SERVER_ERROR";

/// Every failure of a gateway call lands in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("gateway rejected the request as malformed: {message}")]
    BadRequest { message: String },
    #[error("gateway declined the request (code {code}): {message}")]
    Rejected { code: String, message: String },
    #[error("gateway unavailable or returned an unusable response: {message}")]
    Server { message: String },
}

impl GatewayError {
    pub fn server(message: impl Into<String>) -> Self {
        GatewayError::Server {
            message: message.into(),
        }
    }

    /// Only server-side trouble is worth asking again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Server { .. })
    }

    /// Maps the `error.code` of a non-2xx envelope. Unknown codes default to a server error.
    pub fn from_envelope(code: Option<&str>, message: String) -> Self {
        match code.map(|code| code.trim().to_ascii_uppercase()).as_deref() {
            Some(BAD_REQUEST_ERROR) => GatewayError::BadRequest { message },
            Some(GATEWAY_ERROR) => GatewayError::Rejected {
                code: GATEWAY_ERROR.to_string(),
                message,
            },
            _ => GatewayError::Server { message },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else if err.is_decode() {
            "response body could not be decoded".to_string()
        } else {
            "request failed".to_string()
        };
        GatewayError::Server { message }
    }
}
