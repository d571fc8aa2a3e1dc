//! Settlement Engine - Closure, Winner Computation, Payout Enumeration
//!
//! Settlement flow:
//! 1. Ask the ledger to close the battle (idempotent on the ledger side)
//! 2. Interpret the outcome code into a winner
//! 3. Enumerate the payout-eligible voter set
//! 4. Freeze the cached battle with the final tallies
//!
//! Every fault here is `SettlementUnavailable`: funds may already be
//! committed on-chain once the close was requested, so the closure
//! scheduler retries instead of dropping the failure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::domain::battle::{BattleId, Winner};
use crate::domain::settlement::{SettlementResult, WinnerReport};
use crate::error::ServiceError;
use crate::ports::ledger::{LedgerClient, LedgerError};
use crate::usecases::registry::BattleStore;

/// Anything that can settle a battle. The closure scheduler drives this
/// seam so it can be exercised without a live settlement stack.
#[async_trait]
pub trait Settler: Send + Sync + 'static {
  async fn settle(&self, battle_id: BattleId) -> Result<SettlementResult, ServiceError>;
}

/// Computes and caches the final outcome of closed battles.
pub struct SettlementEngine<L: LedgerClient> {
  ledger: Arc<L>,
  store: Arc<BattleStore>,
  /// Settled results; settling twice returns the identical record.
  results: RwLock<HashMap<BattleId, SettlementResult>>,
}

impl<L: LedgerClient> SettlementEngine<L> {
  pub fn new(ledger: Arc<L>, store: Arc<BattleStore>) -> Self {
    Self {
      ledger,
      store,
      results: RwLock::new(HashMap::new()),
    }
  }

  /// Close the battle and compute its settlement.
  ///
  /// Idempotent: once a result exists it is returned as-is, and the
  /// ledger's own close operation returns the previously recorded
  /// outcome for an already-closed battle.
  #[instrument(skip(self), fields(battle_id = %battle_id))]
  pub async fn settle(&self, battle_id: BattleId) -> Result<SettlementResult, ServiceError> {
    {
      let results = self.results.read().await;
      if let Some(result) = results.get(&battle_id) {
        return Ok(result.clone());
      }
    }

    let outcome = self
      .ledger
      .close_battle(battle_id)
      .await
      .map_err(|e| unavailable(battle_id, &e))?;

    let winner = Winner::from_close_code(outcome.code);

    // Single win: that track's voters. Tie (any non-{1,2} code): the
    // full voter list across both tracks.
    let payout_set = match winner.winning_track() {
      Some(track) => self
        .ledger
        .track_voters(battle_id, track)
        .await
        .map_err(|e| unavailable(battle_id, &e))?,
      None => self
        .ledger
        .voter_list(battle_id)
        .await
        .map_err(|e| unavailable(battle_id, &e))?,
    };

    let tally = self
      .ledger
      .tally(battle_id)
      .await
      .map_err(|e| unavailable(battle_id, &e))?;

    self
      .store
      .close(battle_id, winner, tally.track1, tally.track2)
      .await;

    let result = SettlementResult {
      battle_id,
      winner,
      payout_set,
      message: winner.message().to_string(),
    };

    info!(
      winner = ?winner,
      payout_count = result.payout_set.len(),
      track1 = tally.track1,
      track2 = tally.track2,
      "Battle settled"
    );

    // First writer wins so concurrent settles observe one record.
    let mut results = self.results.write().await;
    Ok(results.entry(battle_id).or_insert(result).clone())
  }

  /// The cached settlement, if this battle has settled.
  pub async fn result_for(&self, battle_id: BattleId) -> Option<SettlementResult> {
    let results = self.results.read().await;
    results.get(&battle_id).cloned()
  }

  /// Winner report for queries: the settled result once closed, an
  /// `Undetermined` report while the battle is still Active.
  ///
  /// Falls back to the ledger when the local caches are cold (fresh
  /// process); no correctness depends on surviving a restart.
  pub async fn winner_report(
    &self,
    battle_id: BattleId,
  ) -> Result<WinnerReport, ServiceError> {
    if let Some(result) = self.result_for(battle_id).await {
      return Ok(result.to_report());
    }
    if let Some(battle) = self.store.get(battle_id).await {
      if battle.is_active() {
        return Ok(WinnerReport::undetermined(battle_id));
      }
    }

    // Cache miss or locally-closed battle without a cached result:
    // re-derive from the ledger.
    let details = self
      .ledger
      .battle_details(battle_id)
      .await
      .map_err(|e| unavailable(battle_id, &e))?;
    if details.is_active {
      return Ok(WinnerReport::undetermined(battle_id));
    }

    let winner = Winner::from_close_code(details.winner_code);
    let winner_voters = match winner.winning_track() {
      Some(track) => self
        .ledger
        .track_voters(battle_id, track)
        .await
        .map_err(|e| unavailable(battle_id, &e))?,
      None => self
        .ledger
        .voter_list(battle_id)
        .await
        .map_err(|e| unavailable(battle_id, &e))?,
    };

    Ok(WinnerReport {
      battle_id,
      winner,
      message: winner.message().to_string(),
      winner_voters,
    })
  }
}

#[async_trait]
impl<L: LedgerClient> Settler for SettlementEngine<L> {
  async fn settle(&self, battle_id: BattleId) -> Result<SettlementResult, ServiceError> {
    Self::settle(self, battle_id).await
  }
}

fn unavailable(battle_id: BattleId, fault: &LedgerError) -> ServiceError {
  ServiceError::SettlementUnavailable {
    battle_id,
    reason: fault.to_string(),
  }
}
