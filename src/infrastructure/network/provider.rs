// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use alloy::network::Ethereum;
use alloy::providers::{Provider, RootProvider};
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        Ok(RootProvider::new_http(url))
    }

    /// Connect and verify the endpoint answers. A dead endpoint at startup
    /// is fatal; everything after this point degrades per call instead.
    pub async fn http_checked(rpc_url: &str) -> Result<(HttpProvider, u64), AppError> {
        let provider = Self::http(rpc_url)?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| AppError::Connection(format!("RPC unreachable at startup: {}", e)))?;
        tracing::info!(target: "rpc", chain_id, "Connected to RPC endpoint");
        Ok((provider, chain_id))
    }
}
