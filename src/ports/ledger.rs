//! Ledger Client Port - External Ledger Interaction Interface
//!
//! Defines the trait through which the orchestrator reaches the
//! distributed ledger that holds authoritative battle and vote state.
//! Funded writes go through `submit` (with `estimate_cost` bounding the
//! transaction first); reads are side-effect free. The adapter guarantees
//! that a transaction it reports as submitted is eventually finalized or
//! definitively rejected — no silent limbo.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{BattleId, Track};

/// Why the ledger rejected a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
  /// The voter already holds a vote in this battle.
  DuplicateVote,
  /// The battle's voting period has ended.
  VotingEnded,
  /// Any other contract-level rejection, with the raw reason.
  Other(String),
}

impl std::fmt::Display for RejectReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::DuplicateVote => write!(f, "duplicate vote"),
      Self::VotingEnded => write!(f, "voting period has ended"),
      Self::Other(reason) => write!(f, "{reason}"),
    }
  }
}

/// Faults a ledger operation can produce.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
  /// Transport-level failure reaching the ledger.
  #[error("ledger network fault: {0}")]
  Network(String),
  /// The ledger processed the request and refused it.
  #[error("rejected by ledger: {0}")]
  Rejected(RejectReason),
  /// The bounded call deadline elapsed.
  #[error("ledger call timed out")]
  Timeout,
}

impl LedgerError {
  /// Whether the fault is transient (retry may succeed).
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Network(_) | Self::Timeout)
  }
}

/// A funded write against the battle contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxSpec {
  /// Create a new battle; the ledger assigns the identifier.
  CreateBattle {
    track1: String,
    track2: String,
    creator1: Address,
    creator2: Address,
    initiator: Address,
  },
  /// Cast a vote for one track. The ledger enforces the authoritative
  /// duplicate-check and closure-check atomically.
  CastVote {
    battle_id: BattleId,
    track: Track,
    voter: Address,
  },
  /// Withdraw held funds from the custodial balance to a recipient.
  Withdraw {
    recipient: Address,
    authorizer: Address,
  },
}

/// Event emitted by a finalized transaction, in causal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
  /// A battle was created and assigned this identifier.
  BattleCreated { battle_id: BattleId },
  /// A vote was recorded.
  VoteRecorded { battle_id: BattleId, voter: Address },
}

/// Receipt for a submitted transaction.
#[derive(Debug, Clone)]
pub struct TxReceipt {
  /// Transaction reference (hash) on the ledger.
  pub tx_ref: String,
  /// Events the transaction emitted, causally ordered.
  pub events: Vec<LedgerEvent>,
}

impl TxReceipt {
  /// The battle id from the first `BattleCreated` event, if any.
  pub fn created_battle_id(&self) -> Option<BattleId> {
    self.events.iter().find_map(|event| match event {
      LedgerEvent::BattleCreated { battle_id } => Some(*battle_id),
      _ => None,
    })
  }
}

/// Ledger-side view of one battle.
#[derive(Debug, Clone)]
pub struct BattleDetails {
  /// Label of the first track.
  pub track1: String,
  /// Label of the second track.
  pub track2: String,
  /// Authoritative tally for track 1.
  pub votes_track1: u64,
  /// Authoritative tally for track 2.
  pub votes_track2: u64,
  /// Creation time as a Unix timestamp (seconds).
  pub created_at_secs: u64,
  /// Whether the voting window is still open.
  pub is_active: bool,
  /// Recorded winner code; 0 until closed.
  pub winner_code: u64,
}

/// Authoritative per-track tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackTally {
  pub track1: u64,
  pub track2: u64,
}

/// Outcome of the ledger's (idempotent) close operation.
///
/// Closing an already-closed battle returns the previously recorded
/// outcome rather than re-computing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
  /// Winner code: 1 or 2 for a single-track win, anything else is a tie.
  pub code: u64,
  /// Contract-provided result line.
  pub message: String,
}

/// Trait for ledger interactions, consumed (not implemented) by the core.
///
/// Every method is bounded by the adapter's configured timeout; no call
/// blocks indefinitely. The ledger serializes all writes to a given
/// battle, so its acceptance order is the single source of truth for
/// "who voted first".
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
  /// Bound a funded transaction's maximum resource consumption before
  /// submitting it.
  async fn estimate_cost(
    &self,
    tx: &TxSpec,
    value: Amount,
  ) -> Result<u64, LedgerError>;

  /// Submit a funded transaction and wait for its receipt.
  async fn submit(&self, tx: TxSpec, value: Amount) -> Result<TxReceipt, LedgerError>;

  /// Whether this voter already holds a vote in the battle.
  async fn has_voted(
    &self,
    battle_id: BattleId,
    voter: &Address,
  ) -> Result<bool, LedgerError>;

  /// Full ledger-side battle view.
  async fn battle_details(&self, battle_id: BattleId)
    -> Result<BattleDetails, LedgerError>;

  /// Authoritative per-track tallies.
  async fn tally(&self, battle_id: BattleId) -> Result<TrackTally, LedgerError>;

  /// Number of distinct voters in the battle.
  async fn voter_count(&self, battle_id: BattleId) -> Result<u64, LedgerError>;

  /// Every voter in the battle, in acceptance order.
  async fn voter_list(&self, battle_id: BattleId)
    -> Result<Vec<Address>, LedgerError>;

  /// Voters of one specific track, in acceptance order.
  async fn track_voters(
    &self,
    battle_id: BattleId,
    track: Track,
  ) -> Result<Vec<Address>, LedgerError>;

  /// Close the battle and return the recorded outcome. Idempotent on the
  /// ledger side.
  async fn close_battle(&self, battle_id: BattleId)
    -> Result<CloseOutcome, LedgerError>;

  /// Current custodial contract balance.
  async fn custodial_balance(&self) -> Result<Amount, LedgerError>;

  /// Whether the ledger connection is healthy.
  async fn is_healthy(&self) -> bool;
}
