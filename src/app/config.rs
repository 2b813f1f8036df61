// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::error::AppError;
use crate::domain::types::{SwapFee, Venue};
use alloy::primitives::{Address, U256};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    // General
    #[serde(default = "default_debug")]
    pub debug: bool,

    // Connectivity
    pub rpc_url: String,

    // Identity / execution
    pub private_key: Option<String>,
    pub arb_contract: Option<Address>,
    pub beneficiary: Option<Address>,
    #[serde(default = "default_enable_execution")]
    pub enable_execution: bool,

    // Scan loop
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    #[serde(default = "default_rpc_batch")]
    pub rpc_batch: usize,
    #[serde(default = "default_min_liq_usd")]
    pub min_liq_usd: f64,
    #[serde(default = "default_stale_seconds")]
    pub stale_seconds: u64,

    // Trade sizing and gates
    #[serde(default = "default_loan_amount")]
    pub loan_amount: String,
    #[serde(default = "default_loan_token")]
    pub loan_token: String,
    #[serde(default = "default_min_profit_wei")]
    pub min_profit_wei: String,
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u64,
    #[serde(default = "default_min_profit_usd")]
    pub min_profit_usd: f64,
    #[serde(default = "default_min_exec_spread_bps")]
    pub min_exec_spread_bps: u64,
    #[serde(default = "default_gas_risk_multiplier")]
    pub gas_risk_multiplier: f64,
    #[serde(default = "default_gas_limit")]
    pub default_gas_limit: u64,
    #[serde(default = "default_max_gas_price_gwei")]
    pub max_gas_price_gwei: u64,

    // AMM fee (overridable per deployment; 9975/10000 = 0.25%)
    #[serde(default = "default_amm_fee_num")]
    pub amm_fee_num: u64,
    #[serde(default = "default_amm_fee_den")]
    pub amm_fee_den: u64,

    // Universe
    #[serde(default)]
    pub venues: Vec<Venue>,
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    #[serde(default)]
    pub token_decimals: HashMap<String, u8>,
    #[serde(default = "default_usd_price_map")]
    pub usd_price_map: HashMap<String, f64>,
    #[serde(default = "default_gas_token")]
    pub gas_token: String,

    // Observability
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_debug() -> bool {
    false
}
fn default_enable_execution() -> bool {
    false
}
fn default_scan_interval_ms() -> u64 {
    6_000
}
fn default_rpc_batch() -> usize {
    50
}
fn default_min_liq_usd() -> f64 {
    20_000.0
}
fn default_stale_seconds() -> u64 {
    600
}
fn default_loan_amount() -> String {
    "1000000000000000000".to_string()
}
fn default_loan_token() -> String {
    "WBNB".to_string()
}
fn default_min_profit_wei() -> String {
    "0".to_string()
}
fn default_max_slippage_bps() -> u64 {
    50
}
fn default_min_profit_usd() -> f64 {
    1.0
}
fn default_min_exec_spread_bps() -> u64 {
    20
}
fn default_gas_risk_multiplier() -> f64 {
    1.20
}
fn default_gas_limit() -> u64 {
    450_000
}
fn default_max_gas_price_gwei() -> u64 {
    8
}
fn default_amm_fee_num() -> u64 {
    9_975
}
fn default_amm_fee_den() -> u64 {
    10_000
}
fn default_gas_token() -> String {
    "WBNB".to_string()
}
fn default_metrics_port() -> u16 {
    9_000
}
fn default_broadcast_capacity() -> usize {
    64
}

fn default_usd_price_map() -> HashMap<String, f64> {
    HashMap::from([
        ("WBNB".to_string(), 580.0),
        ("BUSD".to_string(), 1.0),
        ("USDT".to_string(), 1.0),
        ("USDC".to_string(), 1.0),
        ("ETH".to_string(), 3_100.0),
        ("BTCB".to_string(), 97_000.0),
    ])
}

impl Settings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env if present before the environment source is read.
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        builder = builder.add_source(Environment::default());

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.rpc_url.trim().is_empty() {
            return Err(AppError::Config("RPC_URL is missing".to_string()));
        }
        if self.enable_execution {
            if self.private_key.as_deref().unwrap_or("").trim().is_empty() {
                return Err(AppError::Config(
                    "PRIVATE_KEY is required when execution is enabled".to_string(),
                ));
            }
            if self.arb_contract.is_none() {
                return Err(AppError::Config(
                    "ARB_CONTRACT is required when execution is enabled".to_string(),
                ));
            }
            if self.beneficiary.is_none() {
                return Err(AppError::Config(
                    "BENEFICIARY is required when execution is enabled".to_string(),
                ));
            }
        }
        if self.amm_fee_den == 0 || self.amm_fee_num >= self.amm_fee_den {
            return Err(AppError::Config(format!(
                "AMM fee {}/{} is not a valid fee rational",
                self.amm_fee_num, self.amm_fee_den
            )));
        }
        Ok(())
    }

    pub fn swap_fee(&self) -> SwapFee {
        SwapFee::new(self.amm_fee_num, self.amm_fee_den)
    }

    pub fn loan_amount_wei(&self) -> Result<U256, AppError> {
        U256::from_str(self.loan_amount.trim())
            .map_err(|_| AppError::Config(format!("Invalid LOAN_AMOUNT '{}'", self.loan_amount)))
    }

    pub fn min_profit_threshold_wei(&self) -> Result<U256, AppError> {
        U256::from_str(self.min_profit_wei.trim()).map_err(|_| {
            AppError::Config(format!("Invalid MIN_PROFIT_WEI '{}'", self.min_profit_wei))
        })
    }

    /// SYMBOL -> address seed list, addresses parsed and lowercase-deduplicated.
    pub fn seed_tokens(&self) -> Result<Vec<(String, Address)>, AppError> {
        let mut out: Vec<(String, Address)> = Vec::with_capacity(self.tokens.len());
        let mut names: Vec<&String> = self.tokens.keys().collect();
        names.sort();
        for name in names {
            let raw = &self.tokens[name];
            let addr = Address::from_str(raw)
                .map_err(|_| AppError::InvalidAddress(format!("tokens:{name} -> {raw}")))?;
            if !out.iter().any(|(_, a)| *a == addr) {
                out.push((name.to_uppercase(), addr));
            }
        }
        Ok(out)
    }

    pub fn loan_token_address(&self) -> Result<Address, AppError> {
        let wanted = self.loan_token.to_uppercase();
        self.seed_tokens()?
            .into_iter()
            .find(|(sym, _)| *sym == wanted)
            .map(|(_, addr)| addr)
            .ok_or_else(|| {
                AppError::Config(format!("LOAN_TOKEN '{}' is not in the token list", wanted))
            })
    }

    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings {
            debug: false,
            rpc_url: "http://127.0.0.1:8545".into(),
            private_key: None,
            arb_contract: None,
            beneficiary: None,
            enable_execution: false,
            scan_interval_ms: default_scan_interval_ms(),
            rpc_batch: default_rpc_batch(),
            min_liq_usd: default_min_liq_usd(),
            stale_seconds: default_stale_seconds(),
            loan_amount: default_loan_amount(),
            loan_token: "WBNB".into(),
            min_profit_wei: default_min_profit_wei(),
            max_slippage_bps: default_max_slippage_bps(),
            min_profit_usd: default_min_profit_usd(),
            min_exec_spread_bps: default_min_exec_spread_bps(),
            gas_risk_multiplier: default_gas_risk_multiplier(),
            default_gas_limit: default_gas_limit(),
            max_gas_price_gwei: default_max_gas_price_gwei(),
            amm_fee_num: default_amm_fee_num(),
            amm_fee_den: default_amm_fee_den(),
            venues: Vec::new(),
            tokens: HashMap::new(),
            token_decimals: HashMap::new(),
            usd_price_map: default_usd_price_map(),
            gas_token: default_gas_token(),
            metrics_port: 0,
            broadcast_capacity: default_broadcast_capacity(),
        }
    }

    #[test]
    fn execution_mode_requires_signer_and_contract() {
        let mut settings = base_settings();
        settings.enable_execution = true;
        let err = settings.validate().expect_err("missing key must fail");
        assert!(matches!(err, AppError::Config(msg) if msg.contains("PRIVATE_KEY")));
    }

    #[test]
    fn observation_mode_needs_no_signer() {
        let settings = base_settings();
        settings.validate().expect("observation mode is valid");
    }

    #[test]
    fn loan_amount_parses_as_base_units() {
        let settings = base_settings();
        assert_eq!(
            settings.loan_amount_wei().unwrap(),
            U256::from(10u64).pow(U256::from(18u64))
        );
    }

    #[test]
    fn seed_tokens_dedupe_by_address() {
        let mut settings = base_settings();
        settings.tokens.insert(
            "WBNB".into(),
            "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c".into(),
        );
        settings.tokens.insert(
            "WBNB_ALT".into(),
            "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c".into(),
        );
        let seeds = settings.seed_tokens().unwrap();
        assert_eq!(seeds.len(), 1);
    }

    #[test]
    fn rejects_inverted_fee() {
        let mut settings = base_settings();
        settings.amm_fee_num = 10_001;
        assert!(settings.validate().is_err());
    }
}
