use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChargeStatus {
    NotCharged,
    Pending,
    PartiallyCharged,
    FullyCharged,
    Refunded,
    Cancelled,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::NotCharged => "not-charged",
            ChargeStatus::Pending => "pending",
            ChargeStatus::PartiallyCharged => "partially-charged",
            ChargeStatus::FullyCharged => "fully-charged",
            ChargeStatus::Refunded => "refunded",
            ChargeStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "not-charged" => Some(ChargeStatus::NotCharged),
            "pending" => Some(ChargeStatus::Pending),
            "partially-charged" => Some(ChargeStatus::PartiallyCharged),
            "fully-charged" => Some(ChargeStatus::FullyCharged),
            "refunded" => Some(ChargeStatus::Refunded),
            "cancelled" => Some(ChargeStatus::Cancelled),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ChargeStatus::NotCharged => 0,
            ChargeStatus::Pending => 1,
            ChargeStatus::PartiallyCharged => 2,
            ChargeStatus::FullyCharged => 3,
            ChargeStatus::Refunded | ChargeStatus::Cancelled => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeStatus::Refunded | ChargeStatus::Cancelled)
    }

    /// Transitions follow not-charged -> pending -> partially-charged -> fully-charged -> refunded.
    /// `cancelled` is only reachable before any money was captured.
    pub fn can_transition_to(&self, next: ChargeStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            ChargeStatus::Cancelled => {
                matches!(self, ChargeStatus::NotCharged | ChargeStatus::Pending)
            }
            ChargeStatus::Refunded => matches!(
                self,
                ChargeStatus::PartiallyCharged | ChargeStatus::FullyCharged
            ),
            _ => next.rank() > self.rank(),
        }
    }

    /// Returns the status to store after observing `next`; never moves backwards.
    pub fn advance(&self, next: ChargeStatus) -> ChargeStatus {
        if self.can_transition_to(next) {
            next
        } else {
            *self
        }
    }

    pub fn is_captured(&self) -> bool {
        matches!(
            self,
            ChargeStatus::PartiallyCharged | ChargeStatus::FullyCharged
        )
    }

    /// Cancelled or refunded payments must not produce an order.
    pub fn allows_order_creation(&self) -> bool {
        !self.is_terminal()
    }
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
