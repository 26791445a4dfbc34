pub mod amounts;
pub mod currencies;
pub mod enums;
pub mod extra_data;
pub mod gateway_statuses;
pub mod global_ids;
pub mod payment_states;
pub mod reconciliation;
pub mod registration;
pub mod status_checks;
