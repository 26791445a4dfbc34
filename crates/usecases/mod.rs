pub mod errors;
pub mod reconciliation;
