use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Auth,
    Capture,
    Pending,
    ActionToConfirm,
    Cancel,
    Refund,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Auth => "auth",
            TransactionKind::Capture => "capture",
            TransactionKind::Pending => "pending",
            TransactionKind::ActionToConfirm => "action_to_confirm",
            TransactionKind::Cancel => "cancel",
            TransactionKind::Refund => "refund",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "auth" => Some(TransactionKind::Auth),
            "capture" => Some(TransactionKind::Capture),
            "pending" => Some(TransactionKind::Pending),
            "action_to_confirm" => Some(TransactionKind::ActionToConfirm),
            "cancel" => Some(TransactionKind::Cancel),
            "refund" => Some(TransactionKind::Refund),
            _ => None,
        }
    }

    /// Target kind of a registered order: capture when the gateway charges
    /// immediately, auth when capture is left for later.
    pub fn for_auto_capture(auto_capture: bool) -> Self {
        if auto_capture {
            TransactionKind::Capture
        } else {
            TransactionKind::Auth
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
