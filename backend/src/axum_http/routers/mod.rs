pub mod additional_actions;
pub mod payments;
