//! Settlement results and winner reports.

use serde::{Deserialize, Serialize};

use crate::domain::address::Address;
use crate::domain::battle::{BattleId, Winner};

/// Immutable record of a battle's closure.
///
/// Created exactly once when the battle settles; repeated settlement
/// requests return a clone of the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// The settled battle.
    pub battle_id: BattleId,
    /// Resolved outcome.
    pub winner: Winner,
    /// Addresses entitled to a payout, in ledger order. On a single-track
    /// win this is that track's voters; on a tie, the full voter list.
    pub payout_set: Vec<Address>,
    /// Human-readable outcome line.
    pub message: String,
}

impl SettlementResult {
    /// Winner report derived from this settlement.
    pub fn to_report(&self) -> WinnerReport {
        WinnerReport {
            battle_id: self.battle_id,
            winner: self.winner,
            message: self.message.clone(),
            winner_voters: self.payout_set.clone(),
        }
    }
}

/// Answer to a winner query; valid both before and after closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerReport {
    /// The queried battle.
    pub battle_id: BattleId,
    /// Resolved outcome, or `Undetermined` while the battle is Active.
    pub winner: Winner,
    /// Human-readable outcome line.
    pub message: String,
    /// Payout-eligible voters; empty while the battle is Active.
    pub winner_voters: Vec<Address>,
}

impl WinnerReport {
    /// Report for a battle whose voting window is still open.
    pub fn undetermined(battle_id: BattleId) -> Self {
        Self {
            battle_id,
            winner: Winner::Undetermined,
            message: Winner::Undetermined.message().to_string(),
            winner_voters: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_settlement() {
        let voter: Address = format!("0x{}", "1".repeat(40)).parse().unwrap();
        let result = SettlementResult {
            battle_id: BattleId(3),
            winner: Winner::Track1,
            payout_set: vec![voter.clone()],
            message: Winner::Track1.message().to_string(),
        };
        let report = result.to_report();
        assert_eq!(report.winner, Winner::Track1);
        assert_eq!(report.winner_voters, vec![voter]);
        assert_eq!(report.message, "Track 1 is the winner");
    }

    #[test]
    fn test_undetermined_report() {
        let report = WinnerReport::undetermined(BattleId(9));
        assert_eq!(report.winner, Winner::Undetermined);
        assert!(report.winner_voters.is_empty());
    }
}
