//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::address::Address;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config: AppConfig = toml::from_str(&content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  info!(
    voting_window_secs = config.battle.voting_window_secs,
    closure_attempts = config.battle.closure_max_attempts,
    chain_id = config.ledger.chain_id,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Battle timing validation
  anyhow::ensure!(
    config.battle.voting_window_secs > 0,
    "voting_window_secs must be positive"
  );
  anyhow::ensure!(
    config.battle.closure_max_attempts >= 1,
    "closure_max_attempts must be at least 1, got {}",
    config.battle.closure_max_attempts
  );
  anyhow::ensure!(
    config.battle.closure_retry_base_ms > 0,
    "closure_retry_base_ms must be positive"
  );

  // Ledger validation
  anyhow::ensure!(
    !config.ledger.rpc_url.is_empty(),
    "Ledger RPC URL must not be empty"
  );
  anyhow::ensure!(
    Address::is_well_formed(&config.ledger.contract_address),
    "contract_address is not a well-formed address: {}",
    config.ledger.contract_address
  );
  anyhow::ensure!(
    config.ledger.call_timeout_ms > 0,
    "call_timeout_ms must be positive"
  );

  // Metrics validation
  anyhow::ensure!(
    !config.metrics.bind_address.is_empty(),
    "Metrics bind address must not be empty"
  );

  Ok(())
}
