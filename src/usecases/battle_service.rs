//! Battle Service - Typed Inbound Operation Surface
//!
//! The facade the (external) HTTP layer talks to. Composes the registry,
//! vote coordinator, closure scheduler, settlement engine, and fund
//! transfer service into the operations of the contest lifecycle; the
//! HTTP layer is responsible only for marshaling these to wire format
//! and status codes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::instrument;

use crate::config::BattleConfig;
use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{Battle, BattleId, Track};
use crate::domain::settlement::{SettlementResult, WinnerReport};
use crate::domain::vote::VoteOutcome;
use crate::error::ServiceError;
use crate::ports::ledger::{LedgerClient, TrackTally};
use crate::usecases::closure_scheduler::{ClosureScheduler, ClosureState};
use crate::usecases::fund_transfer::{FundTransferService, TransferReceipt};
use crate::usecases::registry::{BattleCreation, BattleRegistry, BattleStore};
use crate::usecases::settlement::SettlementEngine;
use crate::usecases::vote_coordinator::VoteCoordinator;

/// One row of a battle's leaderboard, sorted by votes descending.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
  /// Which track the row describes.
  pub track: Track,
  /// The track's label.
  pub label: String,
  /// Authoritative tally.
  pub votes: u64,
}

/// Facade over the whole battle lifecycle.
pub struct BattleService<L: LedgerClient> {
  ledger: Arc<L>,
  registry: BattleRegistry<L>,
  coordinator: VoteCoordinator<L>,
  settlement: Arc<SettlementEngine<L>>,
  scheduler: Arc<ClosureScheduler<SettlementEngine<L>>>,
  transfer: FundTransferService<L>,
  voting_window: Duration,
}

impl<L: LedgerClient> BattleService<L> {
  /// Wire up the full lifecycle stack over one ledger client.
  pub fn new(ledger: Arc<L>, config: &BattleConfig) -> Self {
    let store = Arc::new(BattleStore::new());
    let settlement = Arc::new(SettlementEngine::new(
      Arc::clone(&ledger),
      Arc::clone(&store),
    ));
    let scheduler = Arc::new(ClosureScheduler::new(
      Arc::clone(&settlement),
      config.closure_max_attempts,
      config.closure_retry_base(),
    ));

    Self {
      registry: BattleRegistry::new(Arc::clone(&ledger), Arc::clone(&store)),
      coordinator: VoteCoordinator::new(Arc::clone(&ledger), store),
      settlement,
      scheduler,
      transfer: FundTransferService::new(Arc::clone(&ledger)),
      ledger,
      voting_window: config.voting_window(),
    }
  }

  /// Create a battle and arm its closure timer.
  #[instrument(skip(self))]
  pub async fn create_battle(
    &self,
    track1: &str,
    track2: &str,
    creator1: &str,
    creator2: &str,
    initiator: &str,
    payment: Amount,
  ) -> Result<BattleCreation, ServiceError> {
    let creation = self
      .registry
      .create(track1, track2, creator1, creator2, initiator, payment)
      .await?;
    self
      .scheduler
      .arm(creation.battle_id, self.voting_window)
      .await;
    Ok(creation)
  }

  /// Cast a vote for track 1 or 2.
  pub async fn cast_vote(
    &self,
    battle_id: BattleId,
    track_number: u8,
    voter: &str,
    payment: Amount,
  ) -> Result<VoteOutcome, ServiceError> {
    let track = Track::from_number(track_number).ok_or_else(|| {
      ServiceError::InvalidInput(format!(
        "track number must be 1 or 2, got {track_number}"
      ))
    })?;
    let voter = voter.parse().map_err(|_| {
      ServiceError::InvalidInput(format!("voter address is malformed: {voter}"))
    })?;
    self
      .coordinator
      .cast_vote(battle_id, track, voter, payment)
      .await
  }

  /// Cached battle view.
  pub async fn get_battle(&self, battle_id: BattleId) -> Result<Battle, ServiceError> {
    self.registry.get(battle_id).await
  }

  /// Authoritative per-track tallies.
  pub async fn get_tally(&self, battle_id: BattleId) -> Result<TrackTally, ServiceError> {
    self
      .ledger
      .tally(battle_id)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))
  }

  /// Number of distinct voters.
  pub async fn get_voter_count(&self, battle_id: BattleId) -> Result<u64, ServiceError> {
    self
      .ledger
      .voter_count(battle_id)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))
  }

  /// Every voter in acceptance order.
  pub async fn get_voter_list(
    &self,
    battle_id: BattleId,
  ) -> Result<Vec<Address>, ServiceError> {
    self
      .ledger
      .voter_list(battle_id)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))
  }

  /// Tallies sorted descending, with track labels.
  pub async fn get_leaderboard(
    &self,
    battle_id: BattleId,
  ) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let details = self
      .ledger
      .battle_details(battle_id)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;

    let mut rows = vec![
      LeaderboardEntry {
        track: Track::One,
        label: details.track1,
        votes: details.votes_track1,
      },
      LeaderboardEntry {
        track: Track::Two,
        label: details.track2,
        votes: details.votes_track2,
      },
    ];
    rows.sort_by(|a, b| b.votes.cmp(&a.votes));
    Ok(rows)
  }

  /// Winner report: the settled result once closed, `Undetermined`
  /// while the battle is still running.
  pub async fn get_winner(
    &self,
    battle_id: BattleId,
  ) -> Result<WinnerReport, ServiceError> {
    self.settlement.winner_report(battle_id).await
  }

  /// Custodial contract balance.
  pub async fn get_balance(&self) -> Result<Amount, ServiceError> {
    self
      .ledger
      .custodial_balance()
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))
  }

  /// Authorized withdrawal to a contest participant.
  pub async fn transfer_to_initiator(
    &self,
    amount: Amount,
    recipient: &str,
    authorizer: &str,
  ) -> Result<TransferReceipt, ServiceError> {
    self.transfer.transfer(amount, recipient, authorizer).await
  }

  /// Manual close request; routes through the scheduler's state machine
  /// so it can never race the timer into a duplicate settlement.
  pub async fn request_close(
    &self,
    battle_id: BattleId,
  ) -> Result<SettlementResult, ServiceError> {
    self.scheduler.trigger(battle_id).await
  }

  /// Administrative abort of a scheduled closure; only before it fires.
  pub async fn cancel_closure(&self, battle_id: BattleId) -> Result<(), ServiceError> {
    self.scheduler.cancel(battle_id).await
  }

  /// Closure state for observability.
  pub async fn closure_state(&self, battle_id: BattleId) -> Option<ClosureState> {
    self.scheduler.state(battle_id).await
  }

  /// Whether the ledger connection is healthy.
  pub async fn is_healthy(&self) -> bool {
    self.ledger.is_healthy().await
  }
}
