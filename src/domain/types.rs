// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::primitives::Address;
use serde::Deserialize;

/// A DEX deployment: one router and the factory it fronts.
/// Configured at startup, immutable for the process lifetime.
#[derive(Debug, Clone, Deserialize)]
pub struct Venue {
    pub name: String,
    pub router: Address,
    pub factory: Address,
}

/// Constant-product swap fee as an exact rational over `den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapFee {
    pub num: u64,
    pub den: u64,
}

impl Default for SwapFee {
    fn default() -> Self {
        // 0.25%: the fee most of the scanned venues actually charge.
        Self {
            num: 9_975,
            den: 10_000,
        }
    }
}

impl SwapFee {
    pub fn new(num: u64, den: u64) -> Self {
        Self { num, den }
    }
}
