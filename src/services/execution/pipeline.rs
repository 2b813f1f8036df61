// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::constants::PROFIT_RETENTION_BPS;
use crate::domain::error::AppError;
use crate::infrastructure::data::abi::{ArbExecutor, UniswapV2Router};
use crate::infrastructure::data::price_table::PriceTable;
use crate::infrastructure::network::gas::{padded_gas_limit, GasOracle};
use crate::infrastructure::network::nonce::NonceManager;
use crate::infrastructure::network::provider::HttpProvider;
use crate::services::arb::finder::Opportunity;
use crate::services::execution::guard::{classify_error, ExecErrorKind, ExecutionGuard};
use crate::services::execution::plan::{ArbPlan, SwapStep};
use crate::services::metrics::{MetricsRegistry, SkipReason};
use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, TxKind, B256, U256};
use alloy::providers::Provider;
use alloy::signers::local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub loan_amount: U256,
    pub min_profit: U256,
    pub min_exec_spread_bps: u64,
    pub max_slippage_bps: u64,
    pub min_profit_usd: f64,
    pub gas_risk_multiplier: f64,
    pub default_gas_limit: u64,
    pub loan_token_symbol: String,
    pub gas_token_symbol: String,
}

/// Confirmed submission, for the dashboard stream.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub tx_hash: B256,
    pub gas_used: u64,
    pub net_profit_usd: f64,
}

/// Validate → gas-model → re-validate → submit, in that order, one
/// opportunity per scan cycle. Each gate either passes the candidate on
/// or drops it with a counted skip reason; submission errors feed the
/// per-router guard.
pub struct ExecutionPipeline {
    provider: HttpProvider,
    signer: PrivateKeySigner,
    executor: Address,
    beneficiary: Address,
    chain_id: u64,
    nonce: NonceManager,
    guard: Arc<ExecutionGuard>,
    metrics: Arc<MetricsRegistry>,
    gas: GasOracle,
    prices: Arc<PriceTable>,
    settings: PipelineSettings,
}

enum WalkAbort {
    RouterBlocked(Address),
    QuoteFailed(Address),
}

impl ExecutionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: HttpProvider,
        signer: PrivateKeySigner,
        executor: Address,
        beneficiary: Address,
        chain_id: u64,
        nonce: NonceManager,
        guard: Arc<ExecutionGuard>,
        metrics: Arc<MetricsRegistry>,
        gas: GasOracle,
        prices: Arc<PriceTable>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            signer,
            executor,
            beneficiary,
            chain_id,
            nonce,
            guard,
            metrics,
            gas,
            prices,
            settings,
        }
    }

    /// Runs the top-ranked opportunity through every gate. Returns the
    /// confirmed outcome, or `None` when any gate dropped it.
    pub async fn run(&self, opps: &[Opportunity]) -> Option<ExecutionOutcome> {
        // Gate A: selection.
        let best = opps.first()?;
        if best.profit_bps() < self.settings.min_exec_spread_bps {
            tracing::debug!(
                target: "pipeline",
                spread_bps = best.profit_bps(),
                floor_bps = self.settings.min_exec_spread_bps,
                "Top opportunity below execution spread floor"
            );
            return None;
        }

        // Gate B: plan construction.
        let mut plan = ArbPlan::from_opportunity(
            best,
            self.settings.loan_amount,
            self.settings.min_profit,
            self.beneficiary,
        );

        // Gate C: pre-trade validation against live router quotes.
        let quoted = match self.quote_walk(&plan.steps, plan.loan_amount).await {
            Ok(q) => q,
            Err(abort) => {
                self.log_walk_abort("validation", &abort);
                self.metrics.record_execution_skip(SkipReason::Validation);
                return None;
            }
        };
        fill_min_outs(&mut plan.steps, &quoted, self.settings.max_slippage_bps);
        let final_out = *quoted.last()?;
        if final_out <= plan.loan_amount {
            self.metrics.record_execution_skip(SkipReason::Validation);
            return None;
        }
        let profit = final_out - plan.loan_amount;
        let profit_usd = self
            .prices
            .symbol_usd(&self.settings.loan_token_symbol, profit);
        if profit_usd < self.settings.min_profit_usd {
            tracing::debug!(target: "pipeline", profit_usd, "Validated profit under USD floor");
            self.metrics.record_execution_skip(SkipReason::Validation);
            return None;
        }

        // Gate D: gas model.
        let gas_limit = self.model_gas_limit(&plan).await;
        let gas_price = self.gas.gas_price().await;
        let gas_cost_wei = U256::from(gas_limit).saturating_mul(U256::from(gas_price));
        let gas_cost_usd = self
            .prices
            .symbol_usd(&self.settings.gas_token_symbol, gas_cost_wei);
        if !gas_gate_ok(profit_usd, gas_cost_usd, self.settings.gas_risk_multiplier) {
            tracing::info!(
                target: "pipeline",
                profit_usd,
                gas_cost_usd,
                "Profit does not clear the gas risk gate"
            );
            self.metrics.record_execution_skip(SkipReason::Gas);
            return None;
        }

        // Gate E: re-validation; the market has had time to move.
        let fresh = match self.quote_walk(&plan.steps, plan.loan_amount).await {
            Ok(q) => q,
            Err(abort) => {
                self.log_walk_abort("final check", &abort);
                self.metrics.record_execution_skip(SkipReason::FinalCheck);
                return None;
            }
        };
        let fresh_out = *fresh.last()?;
        if fresh_out <= plan.loan_amount {
            self.metrics.record_execution_skip(SkipReason::FinalCheck);
            return None;
        }
        let fresh_profit_usd = self
            .prices
            .symbol_usd(&self.settings.loan_token_symbol, fresh_out - plan.loan_amount);
        if !gas_gate_ok(fresh_profit_usd, gas_cost_usd, self.settings.gas_risk_multiplier)
            || !retention_ok(fresh_profit_usd, profit_usd)
        {
            tracing::info!(
                target: "pipeline",
                validated_usd = profit_usd,
                fresh_usd = fresh_profit_usd,
                "Profit decayed between validation and submission"
            );
            self.metrics.record_execution_skip(SkipReason::FinalCheck);
            return None;
        }

        // Gates F/G/H: submit, settle, classify.
        match self
            .submit_and_settle(&plan, gas_limit, gas_price, fresh_profit_usd)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let kind = classify_error(&e.to_string());
                tracing::error!(target: "pipeline", error = %e, kind = kind.as_str(), "Submission failed");
                self.metrics.record_execution_failure(kind);
                for router in plan.routers() {
                    self.guard.record_router_failure(router);
                }
                None
            }
        }
    }

    /// Walk the plan steps against `getAmountsOut`, returning the expected
    /// output of each step. Blocked routers and failed quotes abort the
    /// walk; a failed quote also counts against its router.
    async fn quote_walk(&self, steps: &[SwapStep], loan: U256) -> Result<Vec<U256>, WalkAbort> {
        let mut amount = loan;
        let mut expected = Vec::with_capacity(steps.len());
        for step in steps {
            if self.guard.should_block_router(step.router) {
                return Err(WalkAbort::RouterBlocked(step.router));
            }
            let router = UniswapV2Router::new(step.router, self.provider.clone());
            let amounts = match router.getAmountsOut(amount, step.path.clone()).call().await {
                Ok(amounts) => amounts,
                Err(e) => {
                    tracing::debug!(target: "pipeline", router = %step.router, error = %e, "getAmountsOut failed");
                    self.guard.record_router_failure(step.router);
                    return Err(WalkAbort::QuoteFailed(step.router));
                }
            };
            let Some(out) = amounts.last().copied().filter(|a| !a.is_zero()) else {
                self.guard.record_router_failure(step.router);
                return Err(WalkAbort::QuoteFailed(step.router));
            };
            expected.push(out);
            amount = out;
        }
        Ok(expected)
    }

    async fn model_gas_limit(&self, plan: &ArbPlan) -> u64 {
        let contract = ArbExecutor::new(self.executor, self.provider.clone());
        let call = contract
            .executeArb(plan.to_abi())
            .from(self.signer.address());
        match call.estimate_gas().await {
            Ok(estimate) => padded_gas_limit(estimate),
            Err(e) => {
                tracing::debug!(
                    target: "pipeline",
                    error = %e,
                    fallback = self.settings.default_gas_limit,
                    "estimateGas failed, using fallback limit"
                );
                self.settings.default_gas_limit
            }
        }
    }

    async fn submit_and_settle(
        &self,
        plan: &ArbPlan,
        gas_limit: u64,
        gas_price: u128,
        expected_profit_usd: f64,
    ) -> Result<Option<ExecutionOutcome>, AppError> {
        let nonce = self.nonce.next_nonce().await?;

        let input = ArbExecutor::executeArbCall {
            plan: plan.to_abi(),
        }
        .abi_encode();
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(self.executor),
            value: U256::ZERO,
            input: input.into(),
        };
        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| AppError::Execution(format!("Transaction signing failed: {e}")))?;
        let envelope = TxEnvelope::from(tx.into_signed(signature));
        let raw = envelope.encoded_2718();

        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| AppError::Execution(format!("sendTransaction failed: {e}")))?;
        self.metrics.record_execution_attempt();
        let tx_hash = *pending.tx_hash();
        tracing::info!(target: "pipeline", %tx_hash, nonce, gas_limit, "Arb transaction submitted");

        let receipt = pending.get_receipt().await.map_err(|e| AppError::Transaction {
            hash: format!("{tx_hash:#x}"),
            reason: e.to_string(),
        })?;
        if receipt.status() {
            let gas_used = receipt.gas_used;
            let burned = U256::from(gas_used).saturating_mul(U256::from(gas_price));
            let gas_usd = self
                .prices
                .symbol_usd(&self.settings.gas_token_symbol, burned);
            let net_profit_usd = expected_profit_usd - gas_usd;
            self.metrics.record_execution_success(net_profit_usd);
            tracing::info!(
                target: "pipeline",
                %tx_hash,
                gas_used,
                net_profit_usd,
                "Arb transaction confirmed"
            );
            Ok(Some(ExecutionOutcome {
                tx_hash,
                gas_used,
                net_profit_usd,
            }))
        } else {
            tracing::warn!(target: "pipeline", %tx_hash, "Arb transaction reverted on-chain");
            self.metrics.record_execution_failure(ExecErrorKind::Revert);
            for router in plan.routers() {
                self.guard.record_router_failure(router);
            }
            Ok(None)
        }
    }

    fn log_walk_abort(&self, stage: &str, abort: &WalkAbort) {
        match abort {
            WalkAbort::RouterBlocked(router) => {
                tracing::info!(target: "pipeline", %router, stage, "Router blacklisted, dropping opportunity");
            }
            WalkAbort::QuoteFailed(router) => {
                tracing::info!(target: "pipeline", %router, stage, "Router quote failed, dropping opportunity");
            }
        }
    }
}

/// `min_out` per step from its quoted output. `amount_in` stays as built:
/// the first step carries the loan, later steps keep zero so the executor
/// forwards whatever the previous hop produced.
fn fill_min_outs(steps: &mut [SwapStep], expected: &[U256], max_slippage_bps: u64) {
    for (step, quoted) in steps.iter_mut().zip(expected) {
        step.min_out = min_out_after_slippage(*quoted, max_slippage_bps);
    }
}

pub fn min_out_after_slippage(expected: U256, max_slippage_bps: u64) -> U256 {
    let allowance = expected.saturating_mul(U256::from(max_slippage_bps)) / U256::from(10_000u64);
    expected.saturating_sub(allowance)
}

pub fn gas_gate_ok(profit_usd: f64, gas_cost_usd: f64, risk_multiplier: f64) -> bool {
    profit_usd >= gas_cost_usd * risk_multiplier
}

/// Final-check profit must keep at least half the validation-time profit;
/// exactly half still passes.
pub fn retention_ok(fresh_profit_usd: f64, validated_profit_usd: f64) -> bool {
    fresh_profit_usd >= validated_profit_usd * (PROFIT_RETENTION_BPS as f64 / 10_000.0)
}
