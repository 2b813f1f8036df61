// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use dexcycle::app::config::Settings;
use dexcycle::app::logging::setup_logging;
use dexcycle::domain::error::AppError;
use dexcycle::infrastructure::data::price_table::PriceTable;
use dexcycle::infrastructure::network::broadcast::Broadcaster;
use dexcycle::infrastructure::network::gas::GasOracle;
use dexcycle::infrastructure::network::nonce::NonceManager;
use dexcycle::infrastructure::network::provider::ConnectionFactory;
use dexcycle::services::arb::finder::OpportunityFinder;
use dexcycle::services::engine::Engine;
use dexcycle::services::execution::guard::ExecutionGuard;
use dexcycle::services::execution::pipeline::{ExecutionPipeline, PipelineSettings};
use dexcycle::services::metrics::{spawn_metrics_server, MetricsRegistry};
use dexcycle::services::scanner::{PoolScanner, ScanSettings};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cross-venue V2 arbitrage engine")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Scan and log only, never submit transactions
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Metrics port (overrides config/env, 0 disables)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Force debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Config(msg)) | Err(AppError::InvalidAddress(msg)) => {
            eprintln!("configuration error: {msg}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = Settings::load_with_path(cli.config.as_deref())?;
    if cli.dry_run {
        settings.enable_execution = false;
    }
    if cli.debug {
        settings.debug = true;
    }
    setup_logging(settings.log_level(), false);

    let (provider, chain_id) = ConnectionFactory::http_checked(&settings.rpc_url).await?;

    let seed_tokens = settings.seed_tokens()?;
    let prices = Arc::new(PriceTable::new(
        settings.usd_price_map.clone(),
        settings.token_decimals.clone(),
        &seed_tokens,
    ));
    let metrics = Arc::new(MetricsRegistry::default());
    let broadcaster = Broadcaster::new(settings.broadcast_capacity);
    let guard = Arc::new(ExecutionGuard::new());

    let scanner = PoolScanner::new(
        provider.clone(),
        settings.venues.clone(),
        seed_tokens,
        prices.clone(),
        ScanSettings {
            rpc_batch: settings.rpc_batch,
            min_liq_usd: settings.min_liq_usd,
            stale_seconds: settings.stale_seconds,
        },
    );

    let loan_amount = settings.loan_amount_wei()?;
    let min_profit = settings.min_profit_threshold_wei()?;
    let finder = OpportunityFinder::new(loan_amount, min_profit, settings.swap_fee());

    let pipeline = if settings.enable_execution {
        let key = settings
            .private_key
            .as_deref()
            .ok_or_else(|| AppError::Config("PRIVATE_KEY is missing".into()))?;
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| AppError::Config(format!("Invalid PRIVATE_KEY: {e}")))?;
        let executor = settings
            .arb_contract
            .ok_or_else(|| AppError::Config("ARB_CONTRACT is missing".into()))?;
        let beneficiary = settings
            .beneficiary
            .ok_or_else(|| AppError::Config("BENEFICIARY is missing".into()))?;
        // Cross-check the loan token exists in the seed list up front.
        settings.loan_token_address()?;

        let nonce = NonceManager::new(provider.clone(), signer.address());
        let gas = GasOracle::new(provider.clone(), settings.max_gas_price_gwei);
        tracing::warn!(target: "engine", signer = %signer.address(), "Live execution enabled");
        Some(ExecutionPipeline::new(
            provider.clone(),
            signer,
            executor,
            beneficiary,
            chain_id,
            nonce,
            guard.clone(),
            metrics.clone(),
            gas,
            prices.clone(),
            PipelineSettings {
                loan_amount,
                min_profit,
                min_exec_spread_bps: settings.min_exec_spread_bps,
                max_slippage_bps: settings.max_slippage_bps,
                min_profit_usd: settings.min_profit_usd,
                gas_risk_multiplier: settings.gas_risk_multiplier,
                default_gas_limit: settings.default_gas_limit,
                loan_token_symbol: settings.loan_token.to_uppercase(),
                gas_token_symbol: settings.gas_token.to_uppercase(),
            },
        ))
    } else {
        tracing::info!(target: "engine", "Execution disabled, observation mode");
        None
    };

    let metrics_port = cli.metrics_port.unwrap_or(settings.metrics_port);
    let _metrics_addr = spawn_metrics_server(metrics_port, metrics.clone()).await;

    let engine = Engine::new(
        scanner,
        finder,
        pipeline,
        metrics,
        broadcaster,
        settings.scan_interval_ms,
    );
    engine.run().await
}
