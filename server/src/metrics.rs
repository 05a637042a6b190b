use lotto_execution::SettlementError;
use lotto_types::api::SettlementSummary;
use serde::Serialize;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

/// Fixed-bucket millisecond histogram.
#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);

        match LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            Some(idx) => self.buckets[idx].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };
        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts: self
                .buckets
                .iter()
                .map(|bucket| bucket.load(Ordering::Relaxed))
                .collect(),
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementMetricsSnapshot {
    pub latency: LatencySnapshot,
    pub rounds_settled: u64,
    pub bets_won: u64,
    pub bets_lost: u64,
    pub conflicts: u64,
    pub failures: u64,
}

/// Outcome counters for result submissions.
#[derive(Default)]
pub struct SettlementMetrics {
    latency: LatencyMetrics,
    rounds_settled: AtomicU64,
    bets_won: AtomicU64,
    bets_lost: AtomicU64,
    conflicts: AtomicU64,
    failures: AtomicU64,
}

impl SettlementMetrics {
    pub fn record_success(&self, summary: &SettlementSummary, elapsed: Duration) {
        self.latency.record(elapsed);
        self.rounds_settled.fetch_add(1, Ordering::Relaxed);
        self.bets_won.fetch_add(summary.won, Ordering::Relaxed);
        self.bets_lost.fetch_add(summary.lost, Ordering::Relaxed);
    }

    /// Conflicts are counted apart from other failures; validation and lookup errors are
    /// caller mistakes and are not counted.
    pub fn record_failure(&self, err: &SettlementError) {
        match err {
            SettlementError::Conflict { .. } => {
                self.conflicts.fetch_add(1, Ordering::Relaxed);
            }
            SettlementError::Integrity(_) | SettlementError::Transaction(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            SettlementError::Validation(_) | SettlementError::NotFound(_) => {}
        }
    }

    pub fn snapshot(&self) -> SettlementMetricsSnapshot {
        SettlementMetricsSnapshot {
            latency: self.latency.snapshot(),
            rounds_settled: self.rounds_settled.load(Ordering::Relaxed),
            bets_won: self.bets_won.load(Ordering::Relaxed),
            bets_lost: self.bets_lost.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpMetricsSnapshot {
    pub admin_writes: LatencySnapshot,
    pub reject_origin: u64,
    pub reject_rate_limit: u64,
    pub reject_body_limit: u64,
    pub reject_unauthorized: u64,
}

#[derive(Default)]
pub struct HttpMetrics {
    admin_writes: LatencyMetrics,
    reject_origin: AtomicU64,
    reject_rate_limit: AtomicU64,
    reject_body_limit: AtomicU64,
    reject_unauthorized: AtomicU64,
}

impl HttpMetrics {
    pub fn record_admin_write(&self, duration: Duration) {
        self.admin_writes.record(duration);
    }

    pub fn inc_reject_origin(&self) {
        self.reject_origin.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_rate_limit(&self) {
        self.reject_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_body_limit(&self) {
        self.reject_body_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_unauthorized(&self) {
        self.reject_unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            admin_writes: self.admin_writes.snapshot(),
            reject_origin: self.reject_origin.load(Ordering::Relaxed),
            reject_rate_limit: self.reject_rate_limit.load(Ordering::Relaxed),
            reject_body_limit: self.reject_body_limit.load(Ordering::Relaxed),
            reject_unauthorized: self.reject_unauthorized.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub settlement: SettlementMetricsSnapshot,
    pub http: HttpMetricsSnapshot,
}

/// Prometheus text exposition (format 0.0.4).
pub fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let settlement = &snapshot.settlement;
    let http = &snapshot.http;
    let mut out = String::new();

    append_histogram(&mut out, "lotto_settlement_latency_ms", &settlement.latency);
    append_counter(
        &mut out,
        "lotto_settlement_rounds_total",
        settlement.rounds_settled,
    );
    append_counter(&mut out, "lotto_settlement_bets_won_total", settlement.bets_won);
    append_counter(&mut out, "lotto_settlement_bets_lost_total", settlement.bets_lost);
    append_counter(
        &mut out,
        "lotto_settlement_conflicts_total",
        settlement.conflicts,
    );
    append_counter(
        &mut out,
        "lotto_settlement_failures_total",
        settlement.failures,
    );

    append_histogram(&mut out, "lotto_http_admin_write_latency_ms", &http.admin_writes);
    append_counter(&mut out, "lotto_http_reject_origin_total", http.reject_origin);
    append_counter(
        &mut out,
        "lotto_http_reject_rate_limit_total",
        http.reject_rate_limit,
    );
    append_counter(
        &mut out,
        "lotto_http_reject_body_limit_total",
        http.reject_body_limit,
    );
    append_counter(
        &mut out,
        "lotto_http_reject_unauthorized_total",
        http.reject_unauthorized,
    );
    out
}

fn append_counter(out: &mut String, name: &str, value: u64) {
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {value}");
}

fn append_histogram(out: &mut String, name: &str, snapshot: &LatencySnapshot) {
    let _ = writeln!(out, "# TYPE {name} histogram");
    let mut cumulative = 0u64;
    for (bucket, count) in snapshot.buckets_ms.iter().zip(snapshot.counts.iter()) {
        cumulative = cumulative.saturating_add(*count);
        let _ = writeln!(out, "{name}_bucket{{le=\"{bucket}\"}} {cumulative}");
    }
    cumulative = cumulative.saturating_add(snapshot.overflow);
    let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(out, "{name}_count {}", snapshot.count);
    let sum = snapshot.avg_ms * snapshot.count as f64;
    let _ = writeln!(out, "{name}_sum {sum}");
}
