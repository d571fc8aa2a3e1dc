//! Typed error taxonomy for the orchestrator's inbound operations.
//!
//! Caller errors (bad input, unknown battle, malformed transfer requests)
//! are never retried. Transient infrastructure faults are eligible for
//! bounded retry by the component that observed them, then surfaced.
//! Duplicate and post-closure votes are NOT errors — they are
//! `VoteOutcome` values.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::battle::BattleId;

/// Error type for all inbound operations of the core.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Caller supplied an empty or malformed field.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced battle is unknown.
    #[error("battle {0} not found")]
    NotFound(BattleId),

    /// A funded transaction failed for reasons unrelated to duplication
    /// or closure (network fault, malformed request, ledger rejection).
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The ledger faulted after a close write apparently succeeded.
    /// Must be retried by the closure scheduler, never dropped.
    #[error("settlement unavailable for battle {battle_id}: {reason}")]
    SettlementUnavailable { battle_id: BattleId, reason: String },

    /// Transfer amount was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// An address failed format validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ServiceError {
    /// Whether the fault is transient and eligible for caller-level retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed(_) | Self::SettlementUnavailable { .. }
        )
    }
}
