use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::info;

use crate::{
    axum_http::error_responses::AppError,
    usecases::confirmation::{ConfirmationRequest, ConfirmationUseCase},
};

pub fn routes(usecase: Arc<ConfirmationUseCase>) -> Router {
    Router::new()
        .route(
            "/sberbank/additional-actions",
            get(additional_actions).post(additional_actions),
        )
        .with_state(usecase)
}

/// The gateway's `returnUrl`. Reached by the customer's browser, never by the gateway itself.
pub async fn additional_actions(
    State(usecase): State<Arc<ConfirmationUseCase>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let form: HashMap<String, String> = if method == Method::POST {
        url::form_urlencoded::parse(&body).into_owned().collect()
    } else {
        HashMap::new()
    };
    info!(%method, query_keys = ?query.keys().collect::<Vec<_>>(), "additional_actions: customer returned");

    match usecase.confirm(ConfirmationRequest { query, form }).await {
        Ok(redirect) => (StatusCode::FOUND, [(LOCATION, redirect.location)]).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
