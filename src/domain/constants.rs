// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

/// Maximum attempts for one batched eth_call chunk.
pub const BATCH_MAX_RETRIES: u32 = 5;

/// Base backoff unit for rate-limited batches, in milliseconds.
pub const BATCH_BASE_DELAY_MS: u64 = 150;

/// Consecutive failures after which a router is blacklisted.
pub const ROUTER_FAILURE_LIMIT: u32 = 3;

/// How long a blacklisted router stays blocked, in milliseconds.
pub const ROUTER_BLACKLIST_WINDOW_MS: u64 = 300_000;

/// Hard cap on the token universe per scan cycle.
pub const MAX_TOKENS: usize = 200;

/// Enumeration guard for factories with unbounded pair lists; seed-token
/// discovery is the intended mode for large venues.
pub const MAX_PAIRS_PER_FACTORY: u64 = 5_000;

/// Longest cycle the path search will emit, in edges.
pub const MAX_CYCLE_HOPS: usize = 3;

/// Headroom applied to eth_estimateGas results, in basis points.
pub const GAS_HEADROOM_BPS: u64 = 12_500;

/// Gas price used when the node refuses to quote one: 3 gwei.
pub const FALLBACK_GAS_PRICE_WEI: u128 = 3_000_000_000;

/// Final-check profit must retain at least this share of the
/// validation-time profit, in basis points.
pub const PROFIT_RETENTION_BPS: u64 = 5_000;

pub const WEI_PER_GWEI: u128 = 1_000_000_000;
