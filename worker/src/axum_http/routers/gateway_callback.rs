use std::{collections::BTreeMap, sync::Arc};

use acquiring::usecases::errors::PaymentFlowError;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{error, warn};

use crate::usecases::gateway_callback::GatewayCallbackUseCase;

pub fn routes(usecase: Arc<GatewayCallbackUseCase>) -> Router {
    Router::new()
        .route("/callback", get(callback).post(callback))
        .with_state(usecase)
}

pub async fn callback(
    State(usecase): State<Arc<GatewayCallbackUseCase>>,
    method: Method,
    Query(mut params): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Response {
    if method == Method::POST {
        params.extend(url::form_urlencoded::parse(&body).into_owned());
    }

    match usecase.handle(params).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => map_error(err),
    }
}

fn map_error(err: PaymentFlowError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "gateway_callback: failed");
    } else {
        warn!(error = %err, "gateway_callback: rejected");
    }
    let body = status.canonical_reason().unwrap_or("ERROR");
    (status, body).into_response()
}
