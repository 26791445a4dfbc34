pub mod checkouts;
pub mod jobs;
pub mod orders;
pub mod payments;
pub mod transactions;
