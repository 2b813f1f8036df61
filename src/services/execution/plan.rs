// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::infrastructure::data::abi::ArbExecutor;
use crate::services::arb::finder::Opportunity;
use alloy::primitives::{Address, U256};
use serde::Serialize;

/// One router hop of an executor plan. `amount_in == 0` on any step after
/// the first tells the executor to spend its full intermediate balance.
#[derive(Debug, Clone, Serialize)]
pub struct SwapStep {
    pub router: Address,
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub min_out: U256,
}

/// The flash-loan trade handed to the executor contract. `min_out` values
/// start as placeholders and are only meaningful after the validation walk
/// fills them from live quotes.
#[derive(Debug, Clone, Serialize)]
pub struct ArbPlan {
    pub loan_token: Address,
    pub loan_amount: U256,
    pub min_profit: U256,
    pub beneficiary: Address,
    pub steps: Vec<SwapStep>,
}

impl ArbPlan {
    pub fn from_opportunity(
        opp: &Opportunity,
        loan_amount: U256,
        min_profit: U256,
        beneficiary: Address,
    ) -> Self {
        let steps = match opp {
            Opportunity::Direct {
                token_a,
                token_b,
                buy_leg,
                sell_leg,
                ..
            } => vec![
                SwapStep {
                    router: buy_leg.router,
                    path: vec![*token_a, *token_b],
                    amount_in: loan_amount,
                    min_out: U256::from(1u64),
                },
                SwapStep {
                    router: sell_leg.router,
                    path: vec![*token_b, *token_a],
                    amount_in: U256::ZERO,
                    min_out: U256::from(1u64),
                },
            ],
            Opportunity::Triangular {
                tokens, routers, ..
            } => routers
                .iter()
                .enumerate()
                .map(|(i, router)| SwapStep {
                    router: *router,
                    path: vec![tokens[i], tokens[i + 1]],
                    amount_in: if i == 0 { loan_amount } else { U256::ZERO },
                    min_out: U256::from(1u64),
                })
                .collect(),
        };

        Self {
            loan_token: opp.start_token(),
            loan_amount,
            min_profit,
            beneficiary,
            steps,
        }
    }

    /// ABI view of the plan for `executeArb`.
    pub fn to_abi(&self) -> ArbExecutor::TradePlan {
        ArbExecutor::TradePlan {
            loanToken: self.loan_token,
            loanAmount: self.loan_amount,
            steps: self
                .steps
                .iter()
                .map(|s| ArbExecutor::SwapAction {
                    router: s.router,
                    path: s.path.clone(),
                    amountIn: s.amount_in,
                    minOut: s.min_out,
                })
                .collect(),
            minProfit: self.min_profit,
            beneficiary: self.beneficiary,
        }
    }

    pub fn routers(&self) -> impl Iterator<Item = Address> + '_ {
        self.steps.iter().map(|s| s.router)
    }
}
