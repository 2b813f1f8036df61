// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::constants::MAX_CYCLE_HOPS;
use crate::domain::types::SwapFee;
use crate::services::arb::graph::{Edge, TokenGraph};
use crate::services::arb::math::amount_out;
use crate::services::scanner::{Pool, PoolLeg};
use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::cmp::Ordering;

/// A priced trade candidate. The set of kinds is closed; every consumer
/// (plan builder, scorer, broadcaster) branches on the tag.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Opportunity {
    Direct {
        token_a: Address,
        token_b: Address,
        buy_leg: PoolLeg,
        sell_leg: PoolLeg,
        amount_in: U256,
        amount_out: U256,
        profit: U256,
    },
    Triangular {
        /// k+1 entries, first == last.
        tokens: Vec<Address>,
        venues: Vec<String>,
        routers: Vec<Address>,
        pairs: Vec<Address>,
        amount_in: U256,
        amount_out: U256,
        profit: U256,
    },
}

impl Opportunity {
    pub fn profit(&self) -> U256 {
        match self {
            Opportunity::Direct { profit, .. } => *profit,
            Opportunity::Triangular { profit, .. } => *profit,
        }
    }

    pub fn amount_in(&self) -> U256 {
        match self {
            Opportunity::Direct { amount_in, .. } => *amount_in,
            Opportunity::Triangular { amount_in, .. } => *amount_in,
        }
    }

    /// Token the cycle starts and ends in; the loan asset of any plan
    /// built from this opportunity.
    pub fn start_token(&self) -> Address {
        match self {
            Opportunity::Direct { token_a, .. } => *token_a,
            Opportunity::Triangular { tokens, .. } => tokens[0],
        }
    }

    pub fn hops(&self) -> usize {
        match self {
            Opportunity::Direct { .. } => 2,
            Opportunity::Triangular { tokens, .. } => tokens.len().saturating_sub(1),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Opportunity::Direct { .. })
    }

    /// Floor of profit / amount_in in basis points. Exact integer math;
    /// only used for gates, never for ranking ties.
    pub fn profit_bps(&self) -> u64 {
        let amount_in = self.amount_in();
        if amount_in.is_zero() {
            return 0;
        }
        let bps = self.profit().saturating_mul(U256::from(10_000u64)) / amount_in;
        bps.try_into().unwrap_or(u64::MAX)
    }
}

/// Simulates configured loan volume through direct and triangular cycles
/// and ranks what survives.
pub struct OpportunityFinder {
    loan_amount: U256,
    min_profit: U256,
    fee: SwapFee,
}

impl OpportunityFinder {
    pub fn new(loan_amount: U256, min_profit: U256, fee: SwapFee) -> Self {
        Self {
            loan_amount,
            min_profit,
            fee,
        }
    }

    /// Deterministic for identical snapshots: pools arrive in scan order,
    /// graph enumeration follows insertion order, and the sort is total.
    pub fn find(&self, pools: &[Pool]) -> Vec<Opportunity> {
        let mut opps: Vec<Opportunity> = Vec::new();

        for pool in pools {
            self.direct_from_pool(pool, &mut opps);
        }

        let graph = TokenGraph::from_pools(pools);
        self.triangular_from_graph(&graph, &mut opps);

        opps.sort_by(compare_opportunities);
        opps
    }

    /// All ordered leg pairs of a multi-venue pool: buy token_b on one leg,
    /// sell it back on another. Single-leg pools cannot arb against
    /// themselves and are skipped outright.
    fn direct_from_pool(&self, pool: &Pool, out: &mut Vec<Opportunity>) {
        if pool.legs.len() < 2 {
            return;
        }
        for (i, buy_leg) in pool.legs.iter().enumerate() {
            for (j, sell_leg) in pool.legs.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mid = amount_out(
                    self.loan_amount,
                    buy_leg.reserve_a,
                    buy_leg.reserve_b,
                    self.fee,
                );
                let final_out = amount_out(mid, sell_leg.reserve_b, sell_leg.reserve_a, self.fee);
                if final_out <= self.loan_amount {
                    continue;
                }
                let profit = final_out - self.loan_amount;
                out.push(Opportunity::Direct {
                    token_a: pool.token_a,
                    token_b: pool.token_b,
                    buy_leg: buy_leg.clone(),
                    sell_leg: sell_leg.clone(),
                    amount_in: self.loan_amount,
                    amount_out: final_out,
                    profit,
                });
            }
        }
    }

    fn triangular_from_graph(&self, graph: &TokenGraph, out: &mut Vec<Opportunity>) {
        for &start in graph.tokens() {
            for cycle in graph.cycles_from(start, MAX_CYCLE_HOPS) {
                // Two-edge cycles are the direct searcher's territory.
                if cycle.len() != 3 {
                    continue;
                }
                let Some(final_out) = self.simulate_cycle(&cycle) else {
                    continue;
                };
                if final_out < self.loan_amount.saturating_add(self.min_profit)
                    || final_out <= self.loan_amount
                {
                    continue;
                }
                let profit = final_out - self.loan_amount;
                let mut tokens: Vec<Address> = cycle.iter().map(|e| e.token_in).collect();
                tokens.push(start);
                out.push(Opportunity::Triangular {
                    tokens,
                    venues: cycle.iter().map(|e| e.venue.clone()).collect(),
                    routers: cycle.iter().map(|e| e.router).collect(),
                    pairs: cycle.iter().map(|e| e.pair).collect(),
                    amount_in: self.loan_amount,
                    amount_out: final_out,
                    profit,
                });
            }
        }
    }

    fn simulate_cycle(&self, cycle: &[Edge]) -> Option<U256> {
        let mut amount = self.loan_amount;
        for edge in cycle {
            amount = amount_out(amount, edge.reserve_in, edge.reserve_out, self.fee);
            if amount.is_zero() {
                return None;
            }
        }
        Some(amount)
    }
}

/// Profit descending, then the exact profit ratio descending (compared by
/// cross-multiplication so no rounding enters), then fewer hops first.
fn compare_opportunities(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.profit()
        .cmp(&a.profit())
        .then_with(|| {
            let lhs = b.profit().saturating_mul(a.amount_in());
            let rhs = a.profit().saturating_mul(b.amount_in());
            lhs.cmp(&rhs)
        })
        .then_with(|| a.hops().cmp(&b.hops()))
}
