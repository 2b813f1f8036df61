// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::time::now_ms;
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Frame types on the dashboard stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Log,
    Metrics,
    Opportunities,
    Execution,
    Heartbeat,
    Welcome,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Log => "log",
            FrameKind::Metrics => "metrics",
            FrameKind::Opportunities => "opportunities",
            FrameKind::Execution => "execution",
            FrameKind::Heartbeat => "heartbeat",
            FrameKind::Welcome => "welcome",
        }
    }
}

/// One-way, lossy stream of JSON frames for dashboard consumers. Receivers
/// that fall behind the ring buffer drop frames; nothing is durable and the
/// engine never blocks on a slow consumer.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Value>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }

    pub fn send(&self, kind: FrameKind, data: Value) {
        let frame = json!({
            "type": kind.as_str(),
            "data": data,
            "ts": now_ms(),
        });
        // No receivers is not an error; frames are informational only.
        let _ = self.tx.send(frame);
    }
}
