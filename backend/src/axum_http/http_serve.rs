use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::{confirmation::ConfirmationUseCase, registration::RegistrationUseCase},
};
use acquiring::{
    gateway::{PaymentGateway, sberbank_client::SberbankClient},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            checkouts::CheckoutPostgres, jobs::JobPostgres, orders::OrderPostgres,
            payments::PaymentPostgres, transactions::TransactionPostgres,
        },
    },
    usecases::reconciliation::ReconciliationUseCase,
};
use anyhow::Result;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let gateway_config = Arc::new(config.gateway.clone());
    let gateway: Arc<dyn PaymentGateway + Send + Sync> =
        Arc::new(SberbankClient::new(&gateway_config)?);

    let payment_repository = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let reconciliation = Arc::new(ReconciliationUseCase::new(
        payment_repository.clone(),
        Arc::new(TransactionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CheckoutPostgres::new(Arc::clone(&db_pool))),
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
        Arc::clone(&gateway_config),
    ));
    let registration = Arc::new(RegistrationUseCase::new(
        payment_repository.clone(),
        Arc::new(JobPostgres::new(Arc::clone(&db_pool))),
        Arc::clone(&gateway),
        Arc::clone(&gateway_config),
        config.storefront.public_base_url.clone(),
    ));
    let confirmation = Arc::new(ConfirmationUseCase::new(
        payment_repository,
        gateway,
        reconciliation,
        gateway_config,
    ));

    let app = app(registration, confirmation)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn app(registration: Arc<RegistrationUseCase>, confirmation: Arc<ConfirmationUseCase>) -> Router {
    Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1/payments", routers::payments::routes(registration))
        .merge(routers::additional_actions::routes(confirmation))
        .route("/api/v1/health-check", get(default_routers::health_check))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
