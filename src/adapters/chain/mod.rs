//! Chain Adapters - Ledger Interaction via alloy-rs
//!
//! Connects to the ledger RPC endpoint and implements the
//! `LedgerClient` port against the deployed battle contract.

pub mod contracts;
pub mod provider;

pub use contracts::BattleLedger;
pub use provider::EvmProvider;
