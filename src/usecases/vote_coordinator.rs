//! Vote Coordinator - Deduplicated Voting with Attached Payment
//!
//! Translates a vote intent into a funded ledger write while enforcing
//! one-vote-per-participant-per-battle. The local pre-checks are an
//! optimization to avoid wasted fees; the ledger's serialized
//! acceptance/rejection is the authoritative duplicate- and
//! closure-check, so a lost race here stays benign.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{BattleId, Track};
use crate::domain::vote::{Vote, VoteOutcome};
use crate::error::ServiceError;
use crate::ports::ledger::{LedgerClient, LedgerError, RejectReason, TxSpec};
use crate::usecases::registry::BattleStore;

/// Coordinates vote submission against the ledger.
pub struct VoteCoordinator<L: LedgerClient> {
  ledger: Arc<L>,
  store: Arc<BattleStore>,
}

impl<L: LedgerClient> VoteCoordinator<L> {
  pub fn new(ledger: Arc<L>, store: Arc<BattleStore>) -> Self {
    Self { ledger, store }
  }

  /// Cast a vote.
  ///
  /// Pre-checks (prior vote, battle still active) read the ledger so no
  /// transaction fee is spent on a vote that cannot be accepted. The
  /// funded submit may still lose a race with a concurrent vote from the
  /// same address; the ledger's duplicate-vote / period-ended rejections
  /// are mapped back to `AlreadyVoted` / `BattleClosed` rather than
  /// surfaced as faults.
  #[instrument(skip(self), fields(battle_id = %battle_id, voter = %voter, track = %track))]
  pub async fn cast_vote(
    &self,
    battle_id: BattleId,
    track: Track,
    voter: Address,
    payment: Amount,
  ) -> Result<VoteOutcome, ServiceError> {
    if !payment.is_positive() {
      return Err(ServiceError::InvalidInput(format!(
        "vote payment must be positive, got {payment}"
      )));
    }

    // Pre-check 1: prior vote by this (battle, voter) pair.
    let voted = self
      .ledger
      .has_voted(battle_id, &voter)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;
    if voted {
      debug!("Duplicate vote caught by pre-check, no transaction submitted");
      return Ok(VoteOutcome::AlreadyVoted);
    }

    // Pre-check 2: voting window still open.
    let details = self
      .ledger
      .battle_details(battle_id)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;
    if !details.is_active {
      debug!("Battle already closed, no transaction submitted");
      return Ok(VoteOutcome::BattleClosed);
    }

    let tx = TxSpec::CastVote {
      battle_id,
      track,
      voter: voter.clone(),
    };

    let cost = self
      .ledger
      .estimate_cost(&tx, payment)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;
    debug!(estimated_cost = cost, "Vote transaction cost estimated");

    match self.ledger.submit(tx, payment).await {
      Ok(receipt) => {
        self
          .store
          .record_voter(battle_id, voter.clone(), track)
          .await;
        let vote = Vote {
          battle_id,
          voter,
          track,
          payment,
          accepted_at: Utc::now(),
        };
        info!(
          tx_ref = %receipt.tx_ref,
          accepted_at = %vote.accepted_at,
          "Vote accepted by ledger"
        );
        Ok(VoteOutcome::Accepted {
          tx_ref: receipt.tx_ref,
        })
      }
      // The pre-check raced a concurrent vote; the ledger is the final
      // arbiter of who voted first.
      Err(LedgerError::Rejected(RejectReason::DuplicateVote)) => {
        warn!("Ledger rejected duplicate vote after pre-check race");
        Ok(VoteOutcome::AlreadyVoted)
      }
      Err(LedgerError::Rejected(RejectReason::VotingEnded)) => {
        warn!("Ledger rejected vote after voting period ended");
        Ok(VoteOutcome::BattleClosed)
      }
      Err(e) => Err(ServiceError::TransferFailed(e.to_string())),
    }
  }
}
