// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::retry::jittered_delay;
use crate::domain::constants::BATCH_MAX_RETRIES;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportErrorKind};
use futures::future::join_all;
use tokio::time::sleep;

/// One read-only call: target contract plus ABI-encoded calldata.
#[derive(Debug, Clone)]
pub struct CallSpec {
    pub to: Address,
    pub data: Bytes,
}

impl CallSpec {
    pub fn new(to: Address, data: Vec<u8>) -> Self {
        Self {
            to,
            data: Bytes::from(data),
        }
    }
}

/// Chunked `eth_call` dispatcher. Calls inside a chunk run concurrently;
/// chunks run back to back so no more than `batch_size` requests are in
/// flight at once.
#[derive(Clone)]
pub struct BatchCaller {
    provider: HttpProvider,
}

impl BatchCaller {
    pub fn new(provider: HttpProvider) -> Self {
        Self { provider }
    }

    /// Total: the output always has exactly `calls.len()` entries, in input
    /// order, with `None` marking the calls that individually failed.
    pub async fn batch_call(&self, calls: &[CallSpec], batch_size: usize) -> Vec<Option<Bytes>> {
        let mut out = Vec::with_capacity(calls.len());
        for chunk in calls.chunks(batch_size.max(1)) {
            out.extend(self.call_chunk(chunk).await);
        }
        out
    }

    async fn call_chunk(&self, chunk: &[CallSpec]) -> Vec<Option<Bytes>> {
        for attempt in 1..=BATCH_MAX_RETRIES {
            let futures = chunk.iter().map(|call| {
                let provider = self.provider.clone();
                let tx = TransactionRequest::default()
                    .with_to(call.to)
                    .with_input(call.data.clone());
                async move { provider.call(tx).await }
            });
            let results = join_all(futures).await;

            let rate_limited = results
                .iter()
                .any(|r| matches!(r, Err(e) if is_rate_limited(e)));
            if rate_limited && attempt < BATCH_MAX_RETRIES {
                let delay = jittered_delay(attempt);
                tracing::warn!(
                    target: "rpc",
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Batch rate-limited, backing off"
                );
                sleep(delay).await;
                continue;
            }

            return results
                .into_iter()
                .map(|r| match r {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        tracing::debug!(target: "rpc", error = %e, "eth_call slot failed");
                        None
                    }
                })
                .collect();
        }
        vec![None; chunk.len()]
    }
}

fn is_rate_limited(err: &RpcError<TransportErrorKind>) -> bool {
    if let Some(payload) = err.as_error_resp() {
        if payload.code == -32005 || payload.code == -32000 {
            return true;
        }
    }
    err.to_string().to_lowercase().contains("rate limit")
}
