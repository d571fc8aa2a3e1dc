//! Battle identity, lifecycle status, and winner determination.
//!
//! A battle is one timed two-track voting contest. The ledger assigns the
//! identifier at creation and is the source of truth for tallies; the
//! `Battle` struct here is the registry's cached view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::address::Address;

/// Ledger-assigned battle identifier, unique and immutable once created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BattleId(pub u64);

impl std::fmt::Display for BattleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two competing tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Track {
    One,
    Two,
}

impl Track {
    /// Wire representation used by the ledger contract (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Parse the wire number; anything outside {1, 2} is rejected.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Track {}", self.number())
    }
}

/// Lifecycle status of a battle. Transitions Active -> Closed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    /// Voting window is open.
    Active,
    /// Closure has settled; tallies and winner are frozen.
    Closed,
}

/// Resolved outcome of a battle.
///
/// `Undetermined` while the battle is Active; resolved exactly once at
/// closure and immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Track1,
    Track2,
    Tie,
    Undetermined,
}

impl Winner {
    /// Interpret the ledger's close outcome code.
    ///
    /// Code 1 and 2 name the winning track; every other value (including
    /// the contract's no-votes sentinel) resolves as a tie.
    pub fn from_close_code(code: u64) -> Self {
        match code {
            1 => Self::Track1,
            2 => Self::Track2,
            _ => Self::Tie,
        }
    }

    /// The winning track, if a single track won.
    pub fn winning_track(self) -> Option<Track> {
        match self {
            Self::Track1 => Some(Track::One),
            Self::Track2 => Some(Track::Two),
            Self::Tie | Self::Undetermined => None,
        }
    }

    /// Human-readable outcome line surfaced to callers.
    pub fn message(self) -> &'static str {
        match self {
            Self::Track1 => "Track 1 is the winner",
            Self::Track2 => "Track 2 is the winner",
            Self::Tie => {
                "Match Ties, Money will be distributed to both. All voters are winners."
            }
            Self::Undetermined => "Battle is still active",
        }
    }
}

/// Cached view of one battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    /// Ledger-assigned identifier.
    pub id: BattleId,
    /// Label of the first track.
    pub track1: String,
    /// Label of the second track.
    pub track2: String,
    /// Address credited as creator of track 1.
    pub creator1: Address,
    /// Address credited as creator of track 2.
    pub creator2: Address,
    /// When the creation transaction was accepted.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: BattleStatus,
    /// Cached tally for track 1; frozen once Closed.
    pub votes_track1: u64,
    /// Cached tally for track 2; frozen once Closed.
    pub votes_track2: u64,
    /// Resolved outcome; Undetermined while Active.
    pub winner: Winner,
}

impl Battle {
    /// Register a freshly created battle in the Active state.
    pub fn new(
        id: BattleId,
        track1: String,
        track2: String,
        creator1: Address,
        creator2: Address,
    ) -> Self {
        Self {
            id,
            track1,
            track2,
            creator1,
            creator2,
            created_at: Utc::now(),
            status: BattleStatus::Active,
            votes_track1: 0,
            votes_track2: 0,
            winner: Winner::Undetermined,
        }
    }

    /// Whether votes are still being accepted.
    pub fn is_active(&self) -> bool {
        self.status == BattleStatus::Active
    }

    /// Cached tally for the given track.
    pub fn tally_for(&self, track: Track) -> u64 {
        match track {
            Track::One => self.votes_track1,
            Track::Two => self.votes_track2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tail: char) -> Address {
        format!("0x{}", tail.to_string().repeat(40)).parse().unwrap()
    }

    #[test]
    fn test_track_number_round_trip() {
        assert_eq!(Track::from_number(1), Some(Track::One));
        assert_eq!(Track::from_number(2), Some(Track::Two));
        assert_eq!(Track::from_number(0), None);
        assert_eq!(Track::from_number(3), None);
        assert_eq!(Track::One.number(), 1);
        assert_eq!(Track::Two.number(), 2);
    }

    #[test]
    fn test_winner_from_close_code() {
        assert_eq!(Winner::from_close_code(1), Winner::Track1);
        assert_eq!(Winner::from_close_code(2), Winner::Track2);
        assert_eq!(Winner::from_close_code(0), Winner::Tie);
        assert_eq!(Winner::from_close_code(3), Winner::Tie);
        assert_eq!(Winner::from_close_code(u64::MAX), Winner::Tie);
    }

    #[test]
    fn test_winner_messages() {
        assert_eq!(Winner::Track1.message(), "Track 1 is the winner");
        assert_eq!(Winner::Track2.message(), "Track 2 is the winner");
        assert!(Winner::Tie.message().starts_with("Match Ties"));
    }

    #[test]
    fn test_new_battle_defaults() {
        let battle = Battle::new(
            BattleId(7),
            "SongA".to_string(),
            "SongB".to_string(),
            addr('a'),
            addr('b'),
        );
        assert!(battle.is_active());
        assert_eq!(battle.winner, Winner::Undetermined);
        assert_eq!(battle.tally_for(Track::One), 0);
        assert_eq!(battle.tally_for(Track::Two), 0);
    }

    #[test]
    fn test_battle_id_display() {
        assert_eq!(BattleId(42).to_string(), "42");
        assert_eq!(Track::One.to_string(), "Track 1");
    }
}
