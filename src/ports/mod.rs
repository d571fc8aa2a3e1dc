//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `LedgerClient`: funded writes, reads, and closure against the
//!   external distributed ledger that owns battle state

pub mod ledger;
