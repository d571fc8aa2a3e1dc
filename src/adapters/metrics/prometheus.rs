//! Prometheus Metrics Registry - Contest Observability
//!
//! Registers and exposes Prometheus metrics for Grafana dashboards.
//! Covers battle creation, vote outcomes, closure/settlement activity,
//! withdrawals, and ledger call latency.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the orchestrator.
///
/// All metrics follow the naming convention `trackbattle_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Total battles created.
    pub battles_created: prometheus::IntCounter,
    /// Vote attempts by outcome (accepted / already_voted / battle_closed / failed).
    pub votes: IntCounterVec,
    /// Settlements by outcome (track1 / track2 / tie / degraded).
    pub settlements: IntCounterVec,
    /// Settlement retry attempts.
    pub settlement_retries: prometheus::IntCounter,
    /// Withdrawals by result (submitted / rejected).
    pub transfers: IntCounterVec,
    /// Ledger call latency (seconds) by operation.
    pub ledger_call_seconds: HistogramVec,
    /// Battles currently in the Active state.
    pub active_battles: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let battles_created = prometheus::IntCounter::new(
            "trackbattle_battles_created_total",
            "Total battles created",
        )?;

        let votes = IntCounterVec::new(
            Opts::new("trackbattle_votes_total", "Vote attempts by outcome"),
            &["outcome"],
        )?;

        let settlements = IntCounterVec::new(
            Opts::new(
                "trackbattle_settlements_total",
                "Battle settlements by outcome",
            ),
            &["outcome"],
        )?;

        let settlement_retries = prometheus::IntCounter::new(
            "trackbattle_settlement_retries_total",
            "Settlement attempts beyond the first, per closure",
        )?;

        let transfers = IntCounterVec::new(
            Opts::new(
                "trackbattle_transfers_total",
                "Custodial withdrawals by result",
            ),
            &["result"],
        )?;

        let ledger_call_seconds = HistogramVec::new(
            HistogramOpts::new(
                "trackbattle_ledger_call_seconds",
                "Ledger call latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["operation"],
        )?;

        let active_battles = IntGauge::new(
            "trackbattle_active_battles",
            "Battles currently accepting votes",
        )?;

        // Register all metrics
        registry.register(Box::new(battles_created.clone()))?;
        registry.register(Box::new(votes.clone()))?;
        registry.register(Box::new(settlements.clone()))?;
        registry.register(Box::new(settlement_retries.clone()))?;
        registry.register(Box::new(transfers.clone()))?;
        registry.register(Box::new(ledger_call_seconds.clone()))?;
        registry.register(Box::new(active_battles.clone()))?;

        Ok(Self {
            registry,
            battles_created,
            votes,
            settlements,
            settlement_retries,
            transfers,
            ledger_call_seconds,
            active_battles,
        })
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let registry = metrics_self.registry.clone();
                async move {
                    let encoder = TextEncoder::new();
                    let metric_families = registry.gather();
                    let mut buffer = Vec::new();
                    encoder.encode(&metric_families, &mut buffer).unwrap();
                    String::from_utf8(buffer).unwrap_or_default()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builds_and_counts() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.battles_created.inc();
        metrics.votes.with_label_values(&["accepted"]).inc();
        metrics.votes.with_label_values(&["already_voted"]).inc();
        metrics.active_battles.set(3);

        assert_eq!(metrics.battles_created.get(), 1);
        assert_eq!(metrics.votes.with_label_values(&["accepted"]).get(), 1);
        assert_eq!(metrics.active_battles.get(), 3);
    }
}
