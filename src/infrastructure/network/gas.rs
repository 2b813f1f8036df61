// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::retry::retry_async;
use crate::domain::constants::{FALLBACK_GAS_PRICE_WEI, GAS_HEADROOM_BPS, WEI_PER_GWEI};
use crate::infrastructure::network::provider::HttpProvider;
use alloy::providers::Provider;
use std::time::Duration;

/// Legacy gas pricing with a hard ceiling. The scanned chains quote a flat
/// gas price; EIP-1559 fee splitting buys nothing here.
#[derive(Clone)]
pub struct GasOracle {
    provider: HttpProvider,
    max_gas_price_wei: u128,
}

impl GasOracle {
    pub fn new(provider: HttpProvider, max_gas_price_gwei: u64) -> Self {
        Self {
            provider,
            max_gas_price_wei: max_gas_price_gwei as u128 * WEI_PER_GWEI,
        }
    }

    /// Node-quoted gas price clamped to the configured ceiling; 3 gwei when
    /// the node refuses to answer.
    pub async fn gas_price(&self) -> u128 {
        let provider = self.provider.clone();
        let quoted = retry_async(
            move |_| {
                let provider = provider.clone();
                async move { provider.get_gas_price().await }
            },
            3,
            Duration::from_millis(100),
        )
        .await;

        let price = match quoted {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(target: "gas", error = %e, "Gas price quote failed, using fallback");
                FALLBACK_GAS_PRICE_WEI
            }
        };
        price.min(self.max_gas_price_wei)
    }
}

/// Pad an `eth_estimateGas` result with headroom against state drift
/// between estimation and inclusion.
pub fn padded_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(GAS_HEADROOM_BPS) / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_limit_adds_quarter() {
        assert_eq!(padded_gas_limit(400_000), 500_000);
        assert_eq!(padded_gas_limit(0), 0);
    }

    #[test]
    fn padding_saturates_instead_of_wrapping() {
        // saturating_mul pins the product at u64::MAX before the division.
        assert_eq!(padded_gas_limit(u64::MAX), u64::MAX / 10_000);
    }
}
