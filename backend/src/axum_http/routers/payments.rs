use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::info;
use uuid::Uuid;

use crate::{axum_http::error_responses::AppError, usecases::registration::RegistrationUseCase};

pub fn routes(usecase: Arc<RegistrationUseCase>) -> Router {
    Router::new()
        .route("/:payment_id/sberbank/register", post(register))
        .with_state(usecase)
}

pub async fn register(
    State(usecase): State<Arc<RegistrationUseCase>>,
    Path(payment_id): Path<Uuid>,
) -> Response {
    info!(%payment_id, "payments: register received");
    match usecase.register_payment(payment_id).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
