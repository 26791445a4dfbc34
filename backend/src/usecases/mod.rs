pub mod confirmation;
pub mod registration;
