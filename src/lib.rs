//! Trackbattle — Library Root
//!
//! Re-exports all modules for integration tests and downstream transports.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod usecases;
