use acquiring::{
    domain::repositories::{jobs::JobRepository, payments::PaymentRepository},
    gateway::{PaymentGateway, sberbank_client::SberbankClient},
    infra::db::{
        postgres::postgres_connection,
        repositories::{
            checkouts::CheckoutPostgres, jobs::JobPostgres, orders::OrderPostgres,
            payments::PaymentPostgres, transactions::TransactionPostgres,
        },
    },
    usecases::reconciliation::ReconciliationUseCase,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config, status_polling,
    usecases::{gateway_callback::GatewayCallbackUseCase, status_polling::StatusPollingUseCase},
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    acquiring::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);
    let gateway_config = Arc::new(dotenvy_env.gateway.clone());
    let gateway: Arc<dyn PaymentGateway + Send + Sync> =
        Arc::new(SberbankClient::new(&gateway_config)?);

    let payment_repository: Arc<dyn PaymentRepository + Send + Sync> =
        Arc::new(PaymentPostgres::new(Arc::clone(&db_pool_arc)));
    let job_repository: Arc<dyn JobRepository + Send + Sync> =
        Arc::new(JobPostgres::new(Arc::clone(&db_pool_arc)));

    let reconciliation = Arc::new(ReconciliationUseCase::new(
        Arc::clone(&payment_repository),
        Arc::new(TransactionPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(CheckoutPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::new(OrderPostgres::new(Arc::clone(&db_pool_arc))),
        Arc::clone(&gateway),
        Arc::clone(&gateway_config),
    ));

    let polling_usecase = Arc::new(StatusPollingUseCase::new(
        Arc::clone(&job_repository),
        Arc::clone(&payment_repository),
        Arc::clone(&gateway),
        Arc::clone(&reconciliation),
        Arc::clone(&gateway_config),
        dotenvy_env.status_polling,
    ));

    let callback_usecase = Arc::new(GatewayCallbackUseCase::new(
        payment_repository,
        gateway,
        reconciliation,
        gateway_config,
    ));

    let status_polling_loop = tokio::spawn(status_polling::worker::run(
        job_repository,
        polling_usecase,
        dotenvy_env.status_polling,
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let callback_server = tokio::spawn(async move {
        axum_http::http_serve::start(server_config, callback_usecase).await
    });

    tokio::select! {
        result = status_polling_loop => result??,
        result = callback_server => result??,
    };
    Ok(())
}
