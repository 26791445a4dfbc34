use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_CHECK_JOB_TYPE: &str = "SberbankStatusCheck";

/// Payload of a persisted status-check job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCheckPayload {
    pub order_token: String,
    pub payment_id: Uuid,
}
