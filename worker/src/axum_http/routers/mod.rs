pub mod gateway_callback;
