// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::Address;
use alloy::providers::Provider;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Monotonic nonce source for one signer. Every call reconciles against the
/// network's pending count so externally submitted transactions can only
/// push the cursor forward, never back.
#[derive(Clone)]
pub struct NonceManager {
    provider: HttpProvider,
    address: Address,
    next: Arc<Mutex<Option<u64>>>,
}

impl NonceManager {
    pub fn new(provider: HttpProvider, address: Address) -> Self {
        Self {
            provider,
            address,
            next: Arc::new(Mutex::new(None)),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn next_nonce(&self) -> Result<u64, AppError> {
        let mut guard = self.next.lock().await;

        let network: u64 = self
            .provider
            .get_transaction_count(self.address)
            .pending()
            .await
            .map_err(|e| AppError::Connection(format!("Failed to fetch pending nonce: {}", e)))?;

        let nonce = reconcile(*guard, network);
        *guard = Some(nonce + 1);
        Ok(nonce)
    }
}

/// Local cursor wins unless the network has moved past it.
fn reconcile(cached_next: Option<u64>, network_pending: u64) -> u64 {
    match cached_next {
        Some(next) => next.max(network_pending),
        None => network_pending,
    }
}
