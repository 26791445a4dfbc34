use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Outcome indicator handed to the storefront. Never carries gateway text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Success,
    Pending,
    Failed,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::Pending => "pending",
            ResultCode::Failed => "failed",
        }
    }
}

impl Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
