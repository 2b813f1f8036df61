// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

//! The pure detection pipeline, end to end: assembled pool snapshots in,
//! ranked opportunities and executor plans out. No network anywhere.

use alloy::primitives::{Address, U256};
use dexcycle::domain::types::{SwapFee, Venue};
use dexcycle::infrastructure::data::price_table::PriceTable;
use dexcycle::services::arb::finder::{Opportunity, OpportunityFinder};
use dexcycle::services::arb::math::amount_out;
use dexcycle::services::execution::pipeline::min_out_after_slippage;
use dexcycle::services::execution::plan::ArbPlan;
use dexcycle::services::scanner::{assemble_pools, PairSlots, RawPair};
use std::collections::HashMap;

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

fn addr(byte: u8) -> Address {
    Address::from([byte; 20])
}

fn venue(name: &str, seed: u8) -> Venue {
    Venue {
        name: name.to_string(),
        router: addr(seed),
        factory: addr(seed + 1),
    }
}

fn price_table() -> PriceTable {
    let prices = HashMap::from([("WBNB".to_string(), 580.0), ("BUSD".to_string(), 1.0)]);
    let tokens = vec![
        ("WBNB".to_string(), addr(0x01)),
        ("BUSD".to_string(), addr(0x02)),
    ];
    PriceTable::new(prices, HashMap::new(), &tokens)
}

/// Two venues quote the same pair at a 10% skew; the scan snapshot turns
/// into exactly one direct opportunity whose numbers replay through the
/// AMM formula.
#[test]
fn skewed_pair_scans_into_an_executable_plan() {
    let raw = vec![
        RawPair {
            venue: venue("pancake", 0x10),
            pair: addr(0xAA),
        },
        RawPair {
            venue: venue("biswap", 0x20),
            pair: addr(0xBB),
        },
    ];
    let slots = vec![
        PairSlots {
            token0: Some(addr(0x01)),
            token1: Some(addr(0x02)),
            reserves: Some((e18(1_000_000), e18(1_050_000), 1_000_000)),
        },
        PairSlots {
            token0: Some(addr(0x01)),
            token1: Some(addr(0x02)),
            reserves: Some((e18(1_000_000), e18(950_000), 1_000_000)),
        },
    ];
    let pools = assemble_pools(&raw, &slots, 999_400, 0.0, &price_table());
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].legs.len(), 2);

    let loan = e18(100);
    let finder = OpportunityFinder::new(loan, U256::ZERO, SwapFee::default());
    let opps = finder.find(&pools);
    assert_eq!(opps.len(), 1);

    let Opportunity::Direct {
        buy_leg,
        sell_leg,
        amount_out: final_out,
        profit,
        ..
    } = &opps[0]
    else {
        panic!("expected a direct opportunity");
    };

    // Replay: loan A→B through the buy leg, proceeds B→A through the sell
    // leg; the finder's reported output must match exactly.
    let mid = amount_out(loan, buy_leg.reserve_a, buy_leg.reserve_b, SwapFee::default());
    let replayed = amount_out(mid, sell_leg.reserve_b, sell_leg.reserve_a, SwapFee::default());
    assert_eq!(replayed, *final_out);
    assert!(*final_out > loan);
    assert_eq!(*profit, *final_out - loan);

    // Plan construction: buy hop carries the loan, sell hop forwards.
    let plan = ArbPlan::from_opportunity(&opps[0], loan, U256::ZERO, addr(0xBE));
    assert_eq!(plan.loan_token, addr(0x01));
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].amount_in, loan);
    assert_eq!(plan.steps[1].amount_in, U256::ZERO);
    assert_eq!(plan.steps[0].path, vec![addr(0x01), addr(0x02)]);
    assert_eq!(plan.steps[1].path, vec![addr(0x02), addr(0x01)]);
}

/// An absurd liquidity floor filters the pool before detection ever runs.
#[test]
fn liquidity_floor_silences_the_same_snapshot() {
    let raw = vec![
        RawPair {
            venue: venue("pancake", 0x10),
            pair: addr(0xAA),
        },
        RawPair {
            venue: venue("biswap", 0x20),
            pair: addr(0xBB),
        },
    ];
    let slots = vec![
        PairSlots {
            token0: Some(addr(0x01)),
            token1: Some(addr(0x02)),
            reserves: Some((e18(1_000_000), e18(1_050_000), 1_000_000)),
        },
        PairSlots {
            token0: Some(addr(0x01)),
            token1: Some(addr(0x02)),
            reserves: Some((e18(1_000_000), e18(950_000), 1_000_000)),
        },
    ];
    let pools = assemble_pools(&raw, &slots, 999_400, 1e30, &price_table());
    assert!(pools.is_empty());

    let finder = OpportunityFinder::new(e18(100), U256::ZERO, SwapFee::default());
    assert!(finder.find(&pools).is_empty());
}

/// Reserves last synced before the staleness cutoff are dropped.
#[test]
fn stale_reserves_are_dropped() {
    let raw = vec![RawPair {
        venue: venue("pancake", 0x10),
        pair: addr(0xAA),
    }];
    // latest_ts = 1_000_000, STALE_SECONDS = 600 → cutoff 999_400; the
    // pair last synced at 999_000.
    let slots = vec![PairSlots {
        token0: Some(addr(0x01)),
        token1: Some(addr(0x02)),
        reserves: Some((e18(1_000_000), e18(1_000_000), 999_000)),
    }];
    let pools = assemble_pools(&raw, &slots, 999_400, 0.0, &price_table());
    assert!(pools.is_empty());
}

/// Validation-time slippage never hands the executor a min_out above the
/// quote, across magnitudes.
#[test]
fn slippage_haircut_is_bounded_for_plan_sized_quotes() {
    for quote in [e18(1), e18(104), e18(100_000)] {
        let min_out = min_out_after_slippage(quote, 50);
        assert!(min_out <= quote);
        let haircut = quote - min_out;
        // 50 bps of the quote, up to one unit of floor rounding.
        let cap = quote * U256::from(50u64) / U256::from(10_000u64) + U256::from(1u64);
        assert!(haircut <= cap);
    }
}
