// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::time::now_ms;
use crate::domain::error::AppError;
use crate::infrastructure::network::broadcast::{Broadcaster, FrameKind};
use crate::services::arb::finder::OpportunityFinder;
use crate::services::execution::pipeline::ExecutionPipeline;
use crate::services::metrics::MetricsRegistry;
use crate::services::scanner::PoolScanner;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Periodic driver: scan → find → (optionally) execute → broadcast →
/// sleep out the remainder of the interval. Scans never overlap; a scan
/// that overruns the interval starts the next cycle immediately.
pub struct Engine {
    scanner: PoolScanner,
    finder: OpportunityFinder,
    pipeline: Option<ExecutionPipeline>,
    metrics: Arc<MetricsRegistry>,
    broadcaster: Broadcaster,
    scan_interval: Duration,
}

impl Engine {
    pub fn new(
        scanner: PoolScanner,
        finder: OpportunityFinder,
        pipeline: Option<ExecutionPipeline>,
        metrics: Arc<MetricsRegistry>,
        broadcaster: Broadcaster,
        scan_interval_ms: u64,
    ) -> Self {
        Self {
            scanner,
            finder,
            pipeline,
            metrics,
            broadcaster,
            scan_interval: Duration::from_millis(scan_interval_ms),
        }
    }

    pub async fn run(self) -> Result<(), AppError> {
        self.broadcaster.send(
            FrameKind::Welcome,
            json!({
                "execution_enabled": self.pipeline.is_some(),
                "scan_interval_ms": self.scan_interval.as_millis() as u64,
            }),
        );
        tracing::info!(
            target: "engine",
            execution = self.pipeline.is_some(),
            interval_ms = self.scan_interval.as_millis() as u64,
            "Scan loop starting"
        );

        loop {
            let started = Instant::now();
            self.run_cycle(started).await;

            let elapsed = started.elapsed();
            if elapsed > self.scan_interval {
                tracing::warn!(
                    target: "engine",
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Scan overran the interval, starting next cycle immediately"
                );
            }
            let pause = self.scan_interval.saturating_sub(elapsed);

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(target: "engine", "Interrupt received, shutting down");
                    return Ok(());
                }
                _ = sleep(pause) => {}
            }
        }
    }

    async fn run_cycle(&self, started: Instant) {
        let pools = match self.scanner.scan().await {
            Ok(pools) => pools,
            Err(e) => {
                tracing::warn!(target: "engine", error = %e, "Scan failed, skipping cycle");
                Vec::new()
            }
        };

        let opps = self.finder.find(&pools);
        let direct = opps.iter().filter(|o| o.is_direct()).count() as u64;
        let tri = opps.len() as u64 - direct;
        self.metrics.record_scan(
            started.elapsed().as_millis() as u64,
            opps.len() as u64,
            direct,
            tri,
        );
        if !opps.is_empty() {
            tracing::info!(
                target: "engine",
                total = opps.len(),
                direct,
                triangular = tri,
                best_profit = %opps[0].profit(),
                "Opportunities detected"
            );
        }

        self.broadcaster
            .send(FrameKind::Opportunities, json!(&opps));
        self.broadcaster
            .send(FrameKind::Metrics, json!(self.metrics.snapshot()));

        if let Some(pipeline) = &self.pipeline {
            if !opps.is_empty() {
                if let Some(outcome) = pipeline.run(&opps).await {
                    self.broadcaster.send(
                        FrameKind::Execution,
                        json!({
                            "status": "success",
                            "tx": outcome.tx_hash,
                            "net_profit_usd": outcome.net_profit_usd,
                            "ts": now_ms(),
                        }),
                    );
                }
            }
        }

        self.broadcaster.send(FrameKind::Heartbeat, json!({}));
    }
}
