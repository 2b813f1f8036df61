// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::services::execution::guard::ExecErrorKind;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Why the pipeline dropped an opportunity before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Validation,
    Gas,
    FinalCheck,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Validation => "VALIDATION",
            SkipReason::Gas => "GAS",
            SkipReason::FinalCheck => "FINAL_CHECK",
        }
    }
}

/// Process-wide counters. Accumulate for the whole run; never reset.
#[derive(Default)]
pub struct MetricsRegistry {
    scan_count: AtomicU64,
    last_scan_ms: AtomicU64,
    opps_total: AtomicU64,
    opps_direct: AtomicU64,
    opps_tri: AtomicU64,
    exec_attempted: AtomicU64,
    exec_succeeded: AtomicU64,
    exec_failed: AtomicU64,
    skipped_validation: AtomicU64,
    skipped_gas: AtomicU64,
    skipped_final_check: AtomicU64,
    last_error_kind: Mutex<Option<ExecErrorKind>>,
    net_profit_usd: Mutex<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub scan_count: u64,
    pub last_scan_ms: u64,
    pub opps_total: u64,
    pub opps_direct: u64,
    pub opps_tri: u64,
    pub exec_attempted: u64,
    pub exec_succeeded: u64,
    pub exec_failed: u64,
    pub skipped_validation: u64,
    pub skipped_gas: u64,
    pub skipped_final_check: u64,
    pub last_error_kind: Option<ExecErrorKind>,
    pub net_profit_usd: f64,
}

impl MetricsRegistry {
    pub fn record_scan(&self, duration_ms: u64, total: u64, direct: u64, tri: u64) {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        self.last_scan_ms.store(duration_ms, Ordering::Relaxed);
        self.opps_total.fetch_add(total, Ordering::Relaxed);
        self.opps_direct.fetch_add(direct, Ordering::Relaxed);
        self.opps_tri.fetch_add(tri, Ordering::Relaxed);
    }

    pub fn record_execution_skip(&self, reason: SkipReason) {
        match reason {
            SkipReason::Validation => self.skipped_validation.fetch_add(1, Ordering::Relaxed),
            SkipReason::Gas => self.skipped_gas.fetch_add(1, Ordering::Relaxed),
            SkipReason::FinalCheck => self.skipped_final_check.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_execution_attempt(&self) {
        self.exec_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution_success(&self, net_profit_usd: f64) {
        self.exec_succeeded.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut total) = self.net_profit_usd.lock() {
            *total += net_profit_usd;
        }
    }

    pub fn record_execution_failure(&self, kind: ExecErrorKind) {
        self.exec_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_error_kind.lock() {
            *last = Some(kind);
        }
    }

    /// Deep copy safe to serialize and broadcast.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scan_count: self.scan_count.load(Ordering::Relaxed),
            last_scan_ms: self.last_scan_ms.load(Ordering::Relaxed),
            opps_total: self.opps_total.load(Ordering::Relaxed),
            opps_direct: self.opps_direct.load(Ordering::Relaxed),
            opps_tri: self.opps_tri.load(Ordering::Relaxed),
            exec_attempted: self.exec_attempted.load(Ordering::Relaxed),
            exec_succeeded: self.exec_succeeded.load(Ordering::Relaxed),
            exec_failed: self.exec_failed.load(Ordering::Relaxed),
            skipped_validation: self.skipped_validation.load(Ordering::Relaxed),
            skipped_gas: self.skipped_gas.load(Ordering::Relaxed),
            skipped_final_check: self.skipped_final_check.load(Ordering::Relaxed),
            last_error_kind: self.last_error_kind.lock().ok().and_then(|g| *g),
            net_profit_usd: self.net_profit_usd.lock().map(|g| *g).unwrap_or(0.0),
        }
    }
}

/// Plaintext counter endpoint for scrapers. Port 0 disables it.
pub async fn spawn_metrics_server(
    port: u16,
    metrics: Arc<MetricsRegistry>,
) -> Option<SocketAddr> {
    if port == 0 {
        return None;
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(target: "metrics", error = %e, "Metrics server failed to bind");
            return None;
        }
    };

    let local = listener.local_addr().ok();
    if let Some(addr) = local {
        tracing::info!(target: "metrics", %addr, "Metrics server listening");
    }

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body = render_metrics(&metrics.snapshot());
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
                Err(e) => {
                    tracing::warn!(target: "metrics", error = %e, "Metrics accept error");
                    continue;
                }
            }
        }
    });

    local
}

fn render_metrics(snap: &MetricsSnapshot) -> String {
    let mut body = format!(
        concat!(
            "# TYPE arb_scan_count counter\narb_scan_count {}\n",
            "# TYPE arb_last_scan_ms gauge\narb_last_scan_ms {}\n",
            "# TYPE arb_opps_total counter\narb_opps_total {}\n",
            "# TYPE arb_opps_direct counter\narb_opps_direct {}\n",
            "# TYPE arb_opps_triangular counter\narb_opps_triangular {}\n",
            "# TYPE arb_exec_attempted counter\narb_exec_attempted {}\n",
            "# TYPE arb_exec_succeeded counter\narb_exec_succeeded {}\n",
            "# TYPE arb_exec_failed counter\narb_exec_failed {}\n",
            "# TYPE arb_skipped_validation counter\narb_skipped_validation {}\n",
            "# TYPE arb_skipped_gas counter\narb_skipped_gas {}\n",
            "# TYPE arb_skipped_final_check counter\narb_skipped_final_check {}\n",
            "# TYPE arb_net_profit_usd gauge\narb_net_profit_usd {}\n",
        ),
        snap.scan_count,
        snap.last_scan_ms,
        snap.opps_total,
        snap.opps_direct,
        snap.opps_tri,
        snap.exec_attempted,
        snap.exec_succeeded,
        snap.exec_failed,
        snap.skipped_validation,
        snap.skipped_gas,
        snap.skipped_final_check,
        snap.net_profit_usd,
    );
    if let Some(kind) = snap.last_error_kind {
        body.push_str(&format!(
            "# TYPE arb_last_error gauge\narb_last_error{{kind=\"{}\"}} 1\n",
            kind.as_str()
        ));
    }
    body
}
