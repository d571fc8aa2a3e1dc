//! Vote records and vote-attempt outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{BattleId, Track};

/// An accepted vote. At most one exists per (battle, voter) pair for the
/// lifetime of the battle; the ledger enforces this under concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Battle the vote belongs to.
    pub battle_id: BattleId,
    /// Voter account.
    pub voter: Address,
    /// Chosen track.
    pub track: Track,
    /// Payment attached to the vote transaction.
    pub payment: Amount,
    /// When the ledger accepted the vote.
    pub accepted_at: DateTime<Utc>,
}

/// Result of a vote attempt.
///
/// Duplicate and post-closure votes are expected races, so they are
/// reported as outcomes rather than faults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    /// The ledger accepted the vote; carries the transaction reference.
    Accepted {
        tx_ref: String,
    },
    /// This voter already holds a vote in the battle.
    AlreadyVoted,
    /// The battle's voting window has ended.
    BattleClosed,
}

impl VoteOutcome {
    /// Whether the vote was accepted onto the ledger.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}
