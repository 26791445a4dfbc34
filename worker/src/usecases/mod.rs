pub mod gateway_callback;
pub mod status_polling;
