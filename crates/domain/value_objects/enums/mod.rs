pub mod charge_statuses;
pub mod job_statuses;
pub mod result_codes;
pub mod transaction_kinds;
