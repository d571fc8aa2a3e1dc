//! Ledger RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Manages the connection to the ledger chain via alloy-rs. Validates
//! RPC connectivity and the expected chain id at startup and exposes a
//! shared provider instance for all ledger operations.
//!
//! In alloy 0.9, `ProviderBuilder::new().on_http()` returns a complex
//! filler type. We store it as a type-erased `dyn Provider` to keep
//! the API clean across the adapter layer.

use std::sync::Arc;

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::Address;
use alloy::providers::fillers::{FillProvider, JoinFill, WalletFiller};
use alloy::providers::{Identity, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::LedgerConfig;

/// Concrete alloy provider type produced by
/// `ProviderBuilder::new().wallet(..).on_http(..)` in alloy 0.9.
///
/// alloy 0.9 has no `DynProvider`, and `Arc<dyn Provider>` does not
/// implement `Provider` (the trait requires `Self: Sized`), so the
/// provider is stored under its concrete filler type. It is cheaply
/// cloneable (internally `Arc`-backed), so sharing stays a clone.
pub type LedgerProvider = FillProvider<
    JoinFill<Identity, WalletFiller<EthereumWallet>>,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// Environment variable holding the submitting account's private key.
const PRIVATE_KEY_ENV: &str = "LEDGER_PRIVATE_KEY";

/// Shared ledger RPC provider backed by alloy-rs 0.9.
///
/// All ledger operations share a single provider instance to avoid
/// redundant connections and enable connection pooling. The wallet
/// filler signs every submitted transaction.
pub struct EvmProvider {
    /// The alloy HTTP provider connected to the ledger RPC.
    provider: Arc<LedgerProvider>,
    /// Address of the submitting account.
    wallet_address: Address,
    /// RPC endpoint URL (for diagnostics, never logged with secrets).
    #[allow(dead_code)]
    rpc_url: String,
}

impl EvmProvider {
    /// Connect to the ledger RPC and validate the chain id.
    ///
    /// The RPC URL and expected chain id come from `config.toml`; the
    /// signing key comes from `LEDGER_PRIVATE_KEY` (never from config).
    #[instrument(skip_all)]
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        let rpc_url = config.rpc_url.clone();

        let key = std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("{PRIVATE_KEY_ENV} not set"))?;
        let signer: PrivateKeySigner =
            key.parse().context("Invalid ledger private key")?;
        let wallet_address = signer.address();

        // alloy 0.9: on_http() is synchronous, returns impl Provider
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .on_http(rpc_url.parse().context("Invalid RPC URL")?);

        // Share a single provider instance across the adapter layer.
        let provider: Arc<LedgerProvider> = Arc::new(provider);

        // Validate chain id at startup
        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if chain_id != config.chain_id {
            anyhow::bail!(
                "Expected chain_id={}, got {chain_id}",
                config.chain_id
            );
        }

        info!(chain_id, wallet = %wallet_address, "Connected to ledger RPC");

        Ok(Self {
            provider,
            wallet_address,
            rpc_url,
        })
    }

    /// Get a shared handle to the alloy provider.
    pub fn inner(&self) -> Arc<LedgerProvider> {
        Arc::clone(&self.provider)
    }

    /// Address of the submitting account.
    pub fn wallet_address(&self) -> Address {
        self.wallet_address
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}
