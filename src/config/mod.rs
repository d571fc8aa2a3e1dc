//! Configuration Module - TOML-based Orchestrator Configuration
//!
//! Loads and validates configuration from `config.toml`. The contract
//! address, RPC endpoint, and contest timing parameters are all
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use serde::Deserialize;

/// Top-level orchestrator configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the service begins operation.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub bot: BotConfig,
  /// Contest timing and closure retry policy.
  pub battle: BattleConfig,
  /// Ledger RPC endpoint and contract binding.
  pub ledger: LedgerConfig,
  /// Metrics and health probes.
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Contest timing and closure policy.
#[derive(Debug, Clone, Deserialize)]
pub struct BattleConfig {
  /// Voting window: seconds between creation and scheduled closure.
  #[serde(default = "default_voting_window")]
  pub voting_window_secs: u64,
  /// Maximum settlement attempts before a closure is abandoned.
  #[serde(default = "default_closure_attempts")]
  pub closure_max_attempts: u32,
  /// Base delay between settlement retries (milliseconds, doubled
  /// per attempt).
  #[serde(default = "default_closure_backoff")]
  pub closure_retry_base_ms: u64,
}

/// Ledger RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
  /// JSON-RPC endpoint URL.
  pub rpc_url: String,
  /// Deployed battle contract address.
  pub contract_address: String,
  /// Expected chain id, validated at startup.
  pub chain_id: u64,
  /// Per-call deadline in milliseconds.
  #[serde(default = "default_call_timeout")]
  pub call_timeout_ms: u64,
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl BattleConfig {
  /// Voting window as a `Duration`.
  pub fn voting_window(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.voting_window_secs)
  }

  /// Retry base delay as a `Duration`.
  pub fn closure_retry_base(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.closure_retry_base_ms)
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_voting_window() -> u64 {
  60
}

fn default_closure_attempts() -> u32 {
  4
}

fn default_closure_backoff() -> u64 {
  500
}

fn default_call_timeout() -> u64 {
  30_000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
