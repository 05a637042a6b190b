//! HTTP admin backend for the lotto settlement engine.
//!
//! [`Server`] owns the store, the settlement engine and the metrics; [`Api`] builds the
//! axum router on top of it.

use chrono::Utc;
use lotto_execution::round_lifecycle;
use lotto_execution::{Memory, SettlementEngine, SettlementError};
use lotto_types::api::SettlementSummary;
use lotto_types::lottery::{DrawResult, RoundId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

mod api;
pub use api::Api;

mod metrics;
pub use metrics::{
    HttpMetrics, HttpMetricsSnapshot, MetricsSnapshot, SettlementMetrics,
    SettlementMetricsSnapshot,
};

mod state;
pub use state::{SeedFile, SeedRound, SeedSummary, ServerConfig};

pub struct Server {
    pub config: ServerConfig,
    store: RwLock<Memory>,
    engine: SettlementEngine,
    settlement_metrics: SettlementMetrics,
    http_metrics: HttpMetrics,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Memory::new())
    }

    pub fn with_store(config: ServerConfig, store: Memory) -> Self {
        let engine = SettlementEngine::new(config.settlement);
        Self {
            config,
            store: RwLock::new(store),
            engine,
            settlement_metrics: SettlementMetrics::default(),
            http_metrics: HttpMetrics::default(),
        }
    }

    pub fn store(&self) -> &RwLock<Memory> {
        &self.store
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.http_metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            settlement: self.settlement_metrics.snapshot(),
            http: self.http_metrics.snapshot(),
        }
    }

    /// Settle `round_id` with `result`.
    ///
    /// The round is claimed before waiting for the store, so a second submission for a
    /// round that is still settling gets a conflict instead of queueing behind the first.
    pub async fn settle_round(
        &self,
        round_id: RoundId,
        result: DrawResult,
    ) -> Result<SettlementSummary, SettlementError> {
        let start = Instant::now();
        let outcome = self.settle_locked(round_id, result).await;
        match &outcome {
            Ok(summary) => self
                .settlement_metrics
                .record_success(summary, start.elapsed()),
            Err(err) => {
                tracing::warn!(%round_id, code = err.code(), error = %err, "result submission rejected");
                self.settlement_metrics.record_failure(err);
            }
        }
        outcome
    }

    async fn settle_locked(
        &self,
        round_id: RoundId,
        result: DrawResult,
    ) -> Result<SettlementSummary, SettlementError> {
        let result = result.normalize()?;
        let guard = self.engine.lock_round(round_id)?;
        let mut store = self.store.write().await;
        self.engine.settle(&guard, &mut *store, result).await
    }

    /// Close every open round past its betting window.
    pub async fn close_due_rounds(&self) -> Result<Vec<RoundId>, lotto_execution::StoreError> {
        let mut store = self.store.write().await;
        round_lifecycle::close_due_rounds(&mut *store, Utc::now()).await
    }

    /// Run [`Server::close_due_rounds`] every `period` until the task is aborted.
    pub fn spawn_round_ticker(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(err) = server.close_due_rounds().await {
                    tracing::error!(error = %err, "failed to close due rounds");
                }
            }
        })
    }
}
