//! Battle Registry - In-memory Battle Lifecycle Ownership
//!
//! Exclusively owns the cached lifecycle view of every battle: identity,
//! status, tallies, and the per-battle voter set. The ledger stays the
//! durable source of truth; on conflict the cache defers to it, and the
//! whole store is re-derivable from the ledger after a restart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::domain::battle::{Battle, BattleId, BattleStatus, Track, Winner};
use crate::error::ServiceError;
use crate::ports::ledger::{LedgerClient, TxSpec};

/// Shared, internally synchronized battle cache.
///
/// Guards are scoped and never held across an await; ledger round trips
/// happen strictly outside the locks.
#[derive(Default)]
pub struct BattleStore {
  battles: RwLock<HashMap<BattleId, Battle>>,
  voters: RwLock<HashMap<BattleId, HashSet<Address>>>,
}

impl BattleStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a battle. Overwrites any stale entry for the same id.
  pub async fn insert(&self, battle: Battle) {
    let mut battles = self.battles.write().await;
    battles.insert(battle.id, battle);
  }

  /// Cached view of a battle, if known.
  pub async fn get(&self, battle_id: BattleId) -> Option<Battle> {
    let battles = self.battles.read().await;
    battles.get(&battle_id).cloned()
  }

  /// Record an accepted voter in the battle's voter set and bump the
  /// cached tally.
  pub async fn record_voter(&self, battle_id: BattleId, voter: Address, track: Track) {
    {
      let mut voters = self.voters.write().await;
      voters.entry(battle_id).or_default().insert(voter);
    }
    let mut battles = self.battles.write().await;
    if let Some(battle) = battles.get_mut(&battle_id) {
      if battle.status == BattleStatus::Active {
        match track {
          Track::One => battle.votes_track1 += 1,
          Track::Two => battle.votes_track2 += 1,
        }
      }
    }
  }

  /// Whether the voter is cached as having voted in the battle.
  pub async fn has_voter(&self, battle_id: BattleId, voter: &Address) -> bool {
    let voters = self.voters.read().await;
    voters
      .get(&battle_id)
      .is_some_and(|set| set.contains(voter))
  }

  /// Freeze a battle: mark Closed, resolve the winner, pin final tallies.
  /// The Active -> Closed transition happens at most once; later calls
  /// leave the frozen record untouched.
  pub async fn close(
    &self,
    battle_id: BattleId,
    winner: Winner,
    final_track1: u64,
    final_track2: u64,
  ) {
    let mut battles = self.battles.write().await;
    if let Some(battle) = battles.get_mut(&battle_id) {
      if battle.status == BattleStatus::Active {
        battle.status = BattleStatus::Closed;
        battle.winner = winner;
        battle.votes_track1 = final_track1;
        battle.votes_track2 = final_track2;
      }
    }
  }
}

/// Successful battle creation.
#[derive(Debug, Clone)]
pub struct BattleCreation {
  /// Ledger-assigned battle identifier.
  pub battle_id: BattleId,
  /// Creation transaction reference.
  pub tx_ref: String,
}

/// Creates battles on the ledger and registers them locally.
pub struct BattleRegistry<L: LedgerClient> {
  ledger: Arc<L>,
  store: Arc<BattleStore>,
}

impl<L: LedgerClient> BattleRegistry<L> {
  pub fn new(ledger: Arc<L>, store: Arc<BattleStore>) -> Self {
    Self { ledger, store }
  }

  /// Create a battle: validate, estimate, submit the funded creation
  /// transaction, extract the assigned id from the `BattleCreated`
  /// event, and register the battle as Active.
  #[instrument(skip(self), fields(track1, track2))]
  pub async fn create(
    &self,
    track1: &str,
    track2: &str,
    creator1: &str,
    creator2: &str,
    initiator: &str,
    payment: Amount,
  ) -> Result<BattleCreation, ServiceError> {
    let track1 = track1.trim();
    let track2 = track2.trim();
    if track1.is_empty() || track2.is_empty() {
      return Err(ServiceError::InvalidInput(
        "both track labels must be provided".to_string(),
      ));
    }
    let creator1 = parse_participant(creator1, "creator of track 1")?;
    let creator2 = parse_participant(creator2, "creator of track 2")?;
    let initiator = parse_participant(initiator, "initiator")?;
    if !payment.is_positive() {
      return Err(ServiceError::InvalidInput(format!(
        "payment amount must be positive, got {payment}"
      )));
    }

    let tx = TxSpec::CreateBattle {
      track1: track1.to_string(),
      track2: track2.to_string(),
      creator1: creator1.clone(),
      creator2: creator2.clone(),
      initiator,
    };

    let cost = self
      .ledger
      .estimate_cost(&tx, payment)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;

    let receipt = self
      .ledger
      .submit(tx, payment)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;

    let battle_id = receipt.created_battle_id().ok_or_else(|| {
      ServiceError::TransferFailed(format!(
        "creation receipt {} carried no BattleCreated event",
        receipt.tx_ref
      ))
    })?;

    let battle = Battle::new(
      battle_id,
      track1.to_string(),
      track2.to_string(),
      creator1,
      creator2,
    );
    self.store.insert(battle).await;

    info!(
      battle_id = %battle_id,
      tx_ref = %receipt.tx_ref,
      estimated_cost = cost,
      "Battle created and registered"
    );

    Ok(BattleCreation {
      battle_id,
      tx_ref: receipt.tx_ref,
    })
  }

  /// Cached battle view; `NotFound` if the id is unknown.
  pub async fn get(&self, battle_id: BattleId) -> Result<Battle, ServiceError> {
    self
      .store
      .get(battle_id)
      .await
      .ok_or(ServiceError::NotFound(battle_id))
  }
}

fn parse_participant(raw: &str, role: &str) -> Result<Address, ServiceError> {
  if raw.trim().is_empty() {
    return Err(ServiceError::InvalidInput(format!(
      "{role} address must be provided"
    )));
  }
  raw
    .trim()
    .parse()
    .map_err(|_| ServiceError::InvalidInput(format!("{role} address is malformed: {raw}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(tail: char) -> Address {
    format!("0x{}", tail.to_string().repeat(40)).parse().unwrap()
  }

  fn sample_battle(id: u64) -> Battle {
    Battle::new(
      BattleId(id),
      "SongA".to_string(),
      "SongB".to_string(),
      addr('a'),
      addr('b'),
    )
  }

  #[tokio::test]
  async fn test_store_insert_and_get() {
    let store = BattleStore::new();
    store.insert(sample_battle(1)).await;

    let battle = store.get(BattleId(1)).await.unwrap();
    assert_eq!(battle.track1, "SongA");
    assert!(store.get(BattleId(2)).await.is_none());
  }

  #[tokio::test]
  async fn test_store_records_voters_and_tallies() {
    let store = BattleStore::new();
    store.insert(sample_battle(1)).await;

    let voter = addr('1');
    store.record_voter(BattleId(1), voter.clone(), Track::One).await;
    assert!(store.has_voter(BattleId(1), &voter).await);
    assert!(!store.has_voter(BattleId(1), &addr('2')).await);

    let battle = store.get(BattleId(1)).await.unwrap();
    assert_eq!(battle.votes_track1, 1);
    assert_eq!(battle.votes_track2, 0);
  }

  #[tokio::test]
  async fn test_store_close_is_one_shot() {
    let store = BattleStore::new();
    store.insert(sample_battle(1)).await;

    store.close(BattleId(1), Winner::Track2, 1, 3).await;
    // Second close must not disturb the frozen record.
    store.close(BattleId(1), Winner::Track1, 9, 9).await;

    let battle = store.get(BattleId(1)).await.unwrap();
    assert_eq!(battle.status, BattleStatus::Closed);
    assert_eq!(battle.winner, Winner::Track2);
    assert_eq!(battle.votes_track1, 1);
    assert_eq!(battle.votes_track2, 3);
  }

  #[tokio::test]
  async fn test_tallies_frozen_after_close() {
    let store = BattleStore::new();
    store.insert(sample_battle(1)).await;
    store.close(BattleId(1), Winner::Tie, 2, 2).await;

    store.record_voter(BattleId(1), addr('3'), Track::One).await;
    let battle = store.get(BattleId(1)).await.unwrap();
    assert_eq!(battle.votes_track1, 2);
  }

  #[test]
  fn test_parse_participant_errors() {
    assert!(matches!(
      parse_participant("", "initiator"),
      Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
      parse_participant("0xnope", "initiator"),
      Err(ServiceError::InvalidInput(_))
    ));
    assert!(parse_participant(&format!("0x{}", "c".repeat(40)), "initiator").is_ok());
  }
}
