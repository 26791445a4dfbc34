pub mod axum_http;
pub mod config;
pub mod status_polling;
pub mod usecases;
