//! Use Cases Layer - Contest Lifecycle Orchestration
//!
//! Orchestrates the domain with the ledger port to implement the battle
//! lifecycle. Each use case is a self-contained operation over shared,
//! internally synchronized caches.
//!
//! Use cases:
//! - `BattleRegistry`: battle creation and the cached lifecycle view
//! - `VoteCoordinator`: deduplicated voting with attached payment
//! - `ClosureScheduler`: exactly-once timed closure per battle
//! - `SettlementEngine`: winner computation and payout enumeration
//! - `FundTransferService`: authorized custodial withdrawals
//! - `BattleService`: the typed facade consumed by the HTTP layer

pub mod battle_service;
pub mod closure_scheduler;
pub mod fund_transfer;
pub mod registry;
pub mod settlement;
pub mod vote_coordinator;
