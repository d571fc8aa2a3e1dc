//! Trackbattle Orchestrator — Entry Point
//!
//! Initializes configuration, logging, the ledger connection, and the
//! battle service. Runs until SIGINT/SIGTERM.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Connect ledger RPC (chain id + contract code validated)
//! 4. Build BattleLedger (implements the LedgerClient port)
//! 5. Build BattleService (registry + votes + closure + settlement + transfer)
//! 6. Spawn health server (/live + /ready) and Prometheus metrics
//! 7. Spawn ledger health watcher
//! 8. Wait for SIGINT → graceful shutdown (drain → unready → exit)
//!
//! The HTTP transport that marshals BattleService operations to wire
//! format lives outside this crate and mounts the service handle.

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

mod adapters;
mod config;
mod domain;
mod error;
mod ports;
mod usecases;

use adapters::chain::{BattleLedger, EvmProvider};
use adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use usecases::battle_service::BattleService;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config = config::loader::load_config("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.bot.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        voting_window_secs = config.battle.voting_window_secs,
        chain_id = config.ledger.chain_id,
        "Starting trackbattle orchestrator"
    );

    // ── 3. Shutdown signal channels ─────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health_state = Arc::new(HealthState::new());

    // ── 4. Connect ledger RPC and bind the battle contract ──
    let provider = Arc::new(
        EvmProvider::connect(&config.ledger)
            .await
            .context("Failed to connect to ledger RPC")?,
    );
    let ledger = Arc::new(
        BattleLedger::new(Arc::clone(&provider), &config.ledger)
            .await
            .context("Failed to bind battle contract")?,
    );

    // ── 5. Build the battle service facade ──────────────────
    let service = Arc::new(BattleService::new(Arc::clone(&ledger), &config.battle));

    // ── 6. Spawn health server ──────────────────────────────
    let health_server = HealthServer::new(
        Arc::clone(&health_state),
        config.metrics.health_port,
    );
    let health_handle = tokio::spawn(health_server.run(shutdown_tx.subscribe()));

    // ── 7. Spawn Prometheus metrics server ──────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to build metrics")?);
    let metrics_handle = if config.metrics.enabled {
        Some(tokio::spawn(Arc::clone(&metrics).serve(
            config.metrics.bind_address.clone(),
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    // ── 8. Spawn ledger health watcher ──────────────────────
    let watcher_service = Arc::clone(&service);
    let watcher_health = Arc::clone(&health_state);
    let mut watcher_shutdown = shutdown_tx.subscribe();
    let watcher_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = watcher_shutdown.recv() => break,
                () = tokio::time::sleep(std::time::Duration::from_secs(30)) => {
                    let healthy = watcher_service.is_healthy().await;
                    watcher_health.ledger_healthy.store(healthy, Ordering::Relaxed);
                    if !healthy {
                        warn!("Ledger RPC unhealthy; readiness probe degraded");
                    }
                }
            }
        }
    });

    info!("All tasks spawned — orchestrator is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
    }

    // ── Graceful shutdown ───────────────────────────────────

    // 1. Stop accepting work (readiness probe → 503)
    health_state.accepting_work.store(false, Ordering::Relaxed);

    // 2. Signal all tasks to stop
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 3. Wait for background tasks (bounded)
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        watcher_handle,
    )
    .await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), health_handle).await;

    // In-flight closures hold their own battle state; the ledger remains
    // the source of truth, so pending timers are safe to drop and the
    // scheduler state is re-derivable after restart.
    info!("Shutdown complete");
    Ok(())
}
