pub mod domain;
pub mod gateway;
pub mod infra;
pub mod observability;
pub mod usecases;
