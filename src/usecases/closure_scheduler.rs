//! Closure Scheduler - Exactly-once Contest Closure
//!
//! Arms one one-shot timer per battle at creation. Firing is an explicit
//! per-battle state machine (`Armed -> Fired -> Consumed`) rather than a
//! bare delayed call, so the timer path and a manual close request can
//! never both trigger settlement, and a lost timer never strands a
//! battle: settlement stays safe to request manually.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::domain::battle::BattleId;
use crate::domain::settlement::SettlementResult;
use crate::error::ServiceError;
use crate::usecases::settlement::Settler;

/// Per-battle closure lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureState {
  /// Timer armed; settlement not yet triggered. Cancellation allowed.
  Armed,
  /// A settlement attempt is in flight. Cancellation not permitted.
  Fired,
  /// Settlement finished. `degraded` marks a closure abandoned after the
  /// retry budget; it gets no further automatic attempts but remains
  /// safe to close manually (settlement is idempotent).
  Consumed { degraded: bool },
}

struct ClosureEntry {
  state: ClosureState,
  cancel: Option<oneshot::Sender<()>>,
}

/// Schedules and drives battle closures.
pub struct ClosureScheduler<S: Settler> {
  settler: Arc<S>,
  entries: Mutex<HashMap<BattleId, ClosureEntry>>,
  /// Maximum settlement attempts per firing.
  max_attempts: u32,
  /// Base retry delay, doubled per attempt.
  retry_base: Duration,
}

impl<S: Settler> ClosureScheduler<S> {
  pub fn new(settler: Arc<S>, max_attempts: u32, retry_base: Duration) -> Self {
    Self {
      settler,
      entries: Mutex::new(HashMap::new()),
      max_attempts: max_attempts.max(1),
      retry_base,
    }
  }

  /// Arm the one-shot closure timer for a freshly created battle.
  ///
  /// A battle id can hold at most one entry; a duplicate arm is ignored.
  #[instrument(skip(self), fields(battle_id = %battle_id))]
  pub async fn arm(self: &Arc<Self>, battle_id: BattleId, window: Duration) {
    let (cancel_tx, cancel_rx) = oneshot::channel();
    {
      let mut entries = self.entries.lock().await;
      if entries.contains_key(&battle_id) {
        warn!("Closure already armed for this battle, ignoring duplicate arm");
        return;
      }
      entries.insert(
        battle_id,
        ClosureEntry {
          state: ClosureState::Armed,
          cancel: Some(cancel_tx),
        },
      );
    }

    info!(window_secs = window.as_secs(), "Closure timer armed");

    let scheduler = Arc::clone(self);
    tokio::spawn(async move {
      tokio::select! {
        () = sleep(window) => {
          if let Err(e) = scheduler.trigger(battle_id).await {
            error!(battle_id = %battle_id, error = %e, "Scheduled closure failed");
          }
        }
        // Resolves on an administrative cancel, or when a manual close
        // wins the race and drops the cancel handle.
        _ = cancel_rx => {
          info!(battle_id = %battle_id, "Closure timer disarmed before expiry");
        }
      }
    });
  }

  /// Trigger closure now. Shared by the expired timer and manual close
  /// requests; the Armed -> Fired compare-and-set under the entry lock
  /// guarantees at most one in-flight settlement per battle.
  #[instrument(skip(self), fields(battle_id = %battle_id))]
  pub async fn trigger(
    self: &Arc<Self>,
    battle_id: BattleId,
  ) -> Result<SettlementResult, ServiceError> {
    {
      let mut entries = self.entries.lock().await;
      let entry = entries
        .get_mut(&battle_id)
        .ok_or(ServiceError::NotFound(battle_id))?;
      match entry.state {
        ClosureState::Armed => {
          entry.state = ClosureState::Fired;
          // Past the point of no return; the pending cancel handle dies
          // with the timer task.
          entry.cancel = None;
        }
        ClosureState::Fired => {
          return Err(ServiceError::SettlementUnavailable {
            battle_id,
            reason: "a closure attempt is already in flight".to_string(),
          });
        }
        ClosureState::Consumed { .. } => {
          // Already closed (possibly degraded). Settlement is idempotent,
          // so a manual re-request just resolves to the recorded result.
          drop(entries);
          let result = self.settler.settle(battle_id).await?;
          self.mark_consumed(battle_id, false).await;
          return Ok(result);
        }
      }
    }

    let outcome = self.settle_with_retries(battle_id).await;
    self.mark_consumed(battle_id, outcome.is_err()).await;

    match &outcome {
      Ok(result) => info!(winner = ?result.winner, "Closure consumed"),
      Err(e) => error!(
        error = %e,
        attempts = self.max_attempts,
        "Closure abandoned after retry budget; battle can still be closed manually"
      ),
    }

    outcome
  }

  /// Cancel a scheduled closure. Permitted only while Armed; once Fired
  /// the closure write is not revocable.
  pub async fn cancel(&self, battle_id: BattleId) -> Result<(), ServiceError> {
    let mut entries = self.entries.lock().await;
    match entries.get_mut(&battle_id) {
      None => Err(ServiceError::NotFound(battle_id)),
      Some(entry) if entry.state == ClosureState::Armed => {
        if let Some(cancel) = entry.cancel.take() {
          let _ = cancel.send(());
        }
        entries.remove(&battle_id);
        info!(battle_id = %battle_id, "Scheduled closure cancelled");
        Ok(())
      }
      Some(_) => Err(ServiceError::InvalidInput(format!(
        "closure for battle {battle_id} has already fired and cannot be cancelled"
      ))),
    }
  }

  /// Current closure state for a battle, if scheduled.
  pub async fn state(&self, battle_id: BattleId) -> Option<ClosureState> {
    let entries = self.entries.lock().await;
    entries.get(&battle_id).map(|entry| entry.state)
  }

  /// Bounded settlement retry loop with exponential backoff. Only
  /// transient faults are retried; caller-class faults surface at once.
  async fn settle_with_retries(
    &self,
    battle_id: BattleId,
  ) -> Result<SettlementResult, ServiceError> {
    let mut last_error = None;

    for attempt in 1..=self.max_attempts {
      if attempt > 1 {
        let delay = self.retry_base * 2u32.pow(attempt - 2);
        warn!(
          attempt,
          delay_ms = delay.as_millis() as u64,
          "Retrying settlement"
        );
        sleep(delay).await;
      }

      match self.settler.settle(battle_id).await {
        Ok(result) => return Ok(result),
        Err(e) if e.is_transient() => {
          warn!(attempt, error = %e, "Settlement attempt failed");
          last_error = Some(e);
        }
        Err(e) => return Err(e),
      }
    }

    Err(last_error.unwrap_or(ServiceError::SettlementUnavailable {
      battle_id,
      reason: "settlement retry budget exhausted".to_string(),
    }))
  }

  async fn mark_consumed(&self, battle_id: BattleId, degraded: bool) {
    let mut entries = self.entries.lock().await;
    if let Some(entry) = entries.get_mut(&battle_id) {
      entry.state = ClosureState::Consumed { degraded };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  use async_trait::async_trait;

  use crate::domain::battle::Winner;

  /// Settler stub: fails transiently `fail_first` times, then succeeds.
  struct FlakySettler {
    calls: AtomicU32,
    fail_first: u32,
  }

  impl FlakySettler {
    fn new(fail_first: u32) -> Self {
      Self {
        calls: AtomicU32::new(0),
        fail_first,
      }
    }

    fn calls(&self) -> u32 {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl Settler for FlakySettler {
    async fn settle(&self, battle_id: BattleId) -> Result<SettlementResult, ServiceError> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      if n < self.fail_first {
        return Err(ServiceError::SettlementUnavailable {
          battle_id,
          reason: "ledger unreachable".to_string(),
        });
      }
      Ok(SettlementResult {
        battle_id,
        winner: Winner::Tie,
        payout_set: Vec::new(),
        message: Winner::Tie.message().to_string(),
      })
    }
  }

  fn scheduler(settler: FlakySettler, attempts: u32) -> Arc<ClosureScheduler<FlakySettler>> {
    Arc::new(ClosureScheduler::new(
      Arc::new(settler),
      attempts,
      Duration::from_millis(10),
    ))
  }

  #[tokio::test(start_paused = true)]
  async fn test_timer_fires_once_and_settles() {
    let sched = scheduler(FlakySettler::new(0), 3);
    sched.arm(BattleId(1), Duration::from_secs(60)).await;
    assert_eq!(sched.state(BattleId(1)).await, Some(ClosureState::Armed));

    tokio::time::sleep(Duration::from_secs(61)).await;
    tokio::task::yield_now().await;

    assert_eq!(
      sched.state(BattleId(1)).await,
      Some(ClosureState::Consumed { degraded: false })
    );
    assert_eq!(sched.settler.calls(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_transient_faults_retried_with_backoff() {
    let sched = scheduler(FlakySettler::new(2), 4);
    sched.arm(BattleId(1), Duration::from_secs(1)).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    // Let the backoff sleeps (10ms + 20ms) elapse on the paused clock.
    tokio::time::sleep(Duration::from_secs(1)).await;
    tokio::task::yield_now().await;

    assert_eq!(sched.settler.calls(), 3);
    assert_eq!(
      sched.state(BattleId(1)).await,
      Some(ClosureState::Consumed { degraded: false })
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_budget_exhaustion_degrades() {
    let sched = scheduler(FlakySettler::new(u32::MAX), 3);
    sched.arm(BattleId(1), Duration::from_secs(1)).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;

    assert_eq!(sched.settler.calls(), 3);
    assert_eq!(
      sched.state(BattleId(1)).await,
      Some(ClosureState::Consumed { degraded: true })
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_manual_trigger_consumes_armed_entry() {
    let sched = scheduler(FlakySettler::new(0), 3);
    sched.arm(BattleId(1), Duration::from_secs(3600)).await;

    let result = sched.trigger(BattleId(1)).await.unwrap();
    assert_eq!(result.winner, Winner::Tie);

    // The manual close dropped the cancel handle, so the pending timer
    // task disarmed itself instead of settling a second time.
    tokio::time::sleep(Duration::from_secs(3601)).await;
    tokio::task::yield_now().await;
    assert_eq!(sched.settler.calls(), 1);
    assert_eq!(
      sched.state(BattleId(1)).await,
      Some(ClosureState::Consumed { degraded: false })
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancel_only_before_firing() {
    let sched = scheduler(FlakySettler::new(0), 3);
    sched.arm(BattleId(1), Duration::from_secs(60)).await;

    sched.cancel(BattleId(1)).await.unwrap();
    assert_eq!(sched.state(BattleId(1)).await, None);

    // The cancelled timer must never settle.
    tokio::time::sleep(Duration::from_secs(120)).await;
    tokio::task::yield_now().await;
    assert_eq!(sched.settler.calls(), 0);

    // Cancelling after consumption is rejected.
    sched.arm(BattleId(2), Duration::from_secs(1)).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(matches!(
      sched.cancel(BattleId(2)).await,
      Err(ServiceError::InvalidInput(_))
    ));
  }

  #[tokio::test(start_paused = true)]
  async fn test_duplicate_arm_ignored() {
    let sched = scheduler(FlakySettler::new(0), 3);
    sched.arm(BattleId(1), Duration::from_secs(10)).await;
    sched.arm(BattleId(1), Duration::from_secs(10)).await;

    tokio::time::sleep(Duration::from_secs(11)).await;
    tokio::task::yield_now().await;

    assert_eq!(sched.settler.calls(), 1);
  }

  #[tokio::test]
  async fn test_trigger_unknown_battle() {
    let sched = scheduler(FlakySettler::new(0), 3);
    assert!(matches!(
      sched.trigger(BattleId(404)).await,
      Err(ServiceError::NotFound(_))
    ));
  }
}
