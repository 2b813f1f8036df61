// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::time::now_ms;
use crate::domain::constants::{ROUTER_BLACKLIST_WINDOW_MS, ROUTER_FAILURE_LIMIT};
use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Serialize;

/// Coarse classification of submission-path errors, matched by
/// case-insensitive containment against the provider's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecErrorKind {
    NoLiquidity,
    Revert,
    NonceError,
    ReplacementUnderpriced,
    RateLimit,
    OutOfGas,
    Unknown,
}

impl ExecErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecErrorKind::NoLiquidity => "NO_LIQUIDITY",
            ExecErrorKind::Revert => "REVERT",
            ExecErrorKind::NonceError => "NONCE_ERROR",
            ExecErrorKind::ReplacementUnderpriced => "REPLACEMENT_UNDERPRICED",
            ExecErrorKind::RateLimit => "RATE_LIMIT",
            ExecErrorKind::OutOfGas => "OUT_OF_GAS",
            ExecErrorKind::Unknown => "UNKNOWN",
        }
    }
}

pub fn classify_error(message: &str) -> ExecErrorKind {
    let msg = message.to_lowercase();
    if msg.contains("insufficient liquidity") {
        ExecErrorKind::NoLiquidity
    } else if msg.contains("execution reverted") {
        ExecErrorKind::Revert
    } else if msg.contains("nonce") {
        ExecErrorKind::NonceError
    } else if msg.contains("underpriced") {
        ExecErrorKind::ReplacementUnderpriced
    } else if msg.contains("rate limit") || msg.contains("-32005") || msg.contains("-32000") {
        ExecErrorKind::RateLimit
    } else if msg.contains("intrinsic gas") {
        ExecErrorKind::OutOfGas
    } else {
        ExecErrorKind::Unknown
    }
}

#[derive(Debug, Clone, Copy)]
struct GuardRecord {
    failures: u32,
    last_failure_ms: u64,
}

/// Per-router failure counter with a sliding blacklist window. Keys are
/// lowercase router hex so config- and chain-sourced addresses collide.
pub struct ExecutionGuard {
    records: DashMap<String, GuardRecord>,
    failure_limit: u32,
    window_ms: u64,
}

impl Default for ExecutionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::with_limits(ROUTER_FAILURE_LIMIT, ROUTER_BLACKLIST_WINDOW_MS)
    }

    pub fn with_limits(failure_limit: u32, window_ms: u64) -> Self {
        Self {
            records: DashMap::new(),
            failure_limit,
            window_ms,
        }
    }

    pub fn record_router_failure(&self, router: Address) {
        self.record_failure_at(router, now_ms());
    }

    fn record_failure_at(&self, router: Address, at_ms: u64) {
        let key = Self::key(router);
        let mut entry = self.records.entry(key).or_insert(GuardRecord {
            failures: 0,
            last_failure_ms: 0,
        });
        entry.failures += 1;
        entry.last_failure_ms = at_ms;
        if entry.failures >= self.failure_limit {
            tracing::warn!(
                target: "guard",
                router = %router,
                failures = entry.failures,
                "Router crossed failure limit, blacklisting"
            );
        }
    }

    /// True while the router sits inside the blacklist window. A record
    /// whose window has lapsed is cleared on this lookup.
    pub fn should_block_router(&self, router: Address) -> bool {
        self.should_block_at(router, now_ms())
    }

    fn should_block_at(&self, router: Address, at_ms: u64) -> bool {
        let key = Self::key(router);
        let Some(record) = self.records.get(&key).map(|r| *r) else {
            return false;
        };
        if record.failures < self.failure_limit {
            return false;
        }
        if at_ms.saturating_sub(record.last_failure_ms) <= self.window_ms {
            return true;
        }
        self.records.remove(&key);
        tracing::debug!(target: "guard", router = %router, "Blacklist window lapsed, router cleared");
        false
    }

    fn key(router: Address) -> String {
        format!("{:#x}", router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn classifier_matches_known_provider_messages() {
        assert_eq!(
            classify_error("UniswapV2: INSUFFICIENT LIQUIDITY burned"),
            ExecErrorKind::NoLiquidity
        );
        assert_eq!(
            classify_error("Execution reverted: K"),
            ExecErrorKind::Revert
        );
        assert_eq!(
            classify_error("nonce too low"),
            ExecErrorKind::NonceError
        );
        assert_eq!(
            classify_error("replacement transaction underpriced"),
            ExecErrorKind::ReplacementUnderpriced
        );
        assert_eq!(
            classify_error("Rate Limit exceeded"),
            ExecErrorKind::RateLimit
        );
        assert_eq!(
            classify_error("server returned error code -32005"),
            ExecErrorKind::RateLimit
        );
        assert_eq!(
            classify_error("intrinsic gas too low"),
            ExecErrorKind::OutOfGas
        );
        assert_eq!(classify_error("weird transport hiccup"), ExecErrorKind::Unknown);
    }

    #[test]
    fn blocks_after_limit_within_window() {
        let guard = ExecutionGuard::new();
        let router = addr(0x42);
        for _ in 0..3 {
            guard.record_failure_at(router, 1_000);
        }
        assert!(guard.should_block_at(router, 1_000 + 240_000));
    }

    #[test]
    fn below_limit_never_blocks() {
        let guard = ExecutionGuard::new();
        let router = addr(0x42);
        guard.record_failure_at(router, 1_000);
        guard.record_failure_at(router, 2_000);
        assert!(!guard.should_block_at(router, 2_000));
    }

    #[test]
    fn lapsed_window_clears_the_record() {
        let guard = ExecutionGuard::new();
        let router = addr(0x42);
        for _ in 0..3 {
            guard.record_failure_at(router, 1_000);
        }
        // Past the 5-minute window: cleared, and a fresh failure starts at 1.
        assert!(!guard.should_block_at(router, 1_000 + 300_001));
        guard.record_failure_at(router, 400_000);
        assert!(!guard.should_block_at(router, 400_000));
    }

    #[test]
    fn boundary_of_window_still_blocks() {
        let guard = ExecutionGuard::new();
        let router = addr(0x42);
        for _ in 0..3 {
            guard.record_failure_at(router, 0);
        }
        assert!(guard.should_block_at(router, 300_000));
        assert!(!guard.should_block_at(router, 300_001));
    }

    #[test]
    fn routers_are_tracked_independently() {
        let guard = ExecutionGuard::new();
        for _ in 0..3 {
            guard.record_failure_at(addr(0x42), 1_000);
        }
        assert!(guard.should_block_at(addr(0x42), 1_000));
        assert!(!guard.should_block_at(addr(0x43), 1_000));
    }
}
