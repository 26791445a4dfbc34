use std::fmt::Display;

use crate::domain::{
    entities::transactions::TransactionEntity,
    value_objects::enums::transaction_kinds::TransactionKind,
};

/// Lifecycle of a payment as derived from its token and ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Unregistered,
    Registered,
    ActionToConfirm,
    Authorized,
    Captured,
    Failed,
}

impl PaymentState {
    /// `transactions` must be ordered by `created_at`, oldest first.
    pub fn derive(token: Option<&str>, transactions: &[TransactionEntity]) -> Self {
        if token.is_none_or(str::is_empty) && transactions.is_empty() {
            return PaymentState::Unregistered;
        }

        let mut state = PaymentState::Registered;
        for txn in transactions {
            let Some(kind) = txn.kind() else {
                continue;
            };
            state = match (kind, txn.is_success) {
                // Refund or void closes the payment for good.
                (TransactionKind::Cancel | TransactionKind::Refund, true) => {
                    return PaymentState::Failed;
                }
                (_, false) => match state {
                    PaymentState::Registered | PaymentState::ActionToConfirm => {
                        PaymentState::Failed
                    }
                    settled => settled,
                },
                (TransactionKind::Capture, true) => PaymentState::Captured,
                (TransactionKind::Auth, true) if state != PaymentState::Captured => {
                    PaymentState::Authorized
                }
                (TransactionKind::ActionToConfirm, true)
                    if matches!(state, PaymentState::Registered | PaymentState::Failed) =>
                {
                    PaymentState::ActionToConfirm
                }
                (_, true) => state,
            };
        }
        state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Captured | PaymentState::Authorized | PaymentState::Failed
        )
    }
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            PaymentState::Unregistered => "unregistered",
            PaymentState::Registered => "registered",
            PaymentState::ActionToConfirm => "action_to_confirm",
            PaymentState::Authorized => "authorized",
            PaymentState::Captured => "captured",
            PaymentState::Failed => "failed",
        };
        f.write_str(state)
    }
}
