// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::retry::retry_async;
use crate::common::time::current_unix;
use crate::domain::constants::{MAX_PAIRS_PER_FACTORY, MAX_TOKENS};
use crate::domain::error::AppError;
use crate::domain::types::Venue;
use crate::infrastructure::data::abi::{UniswapV2Factory, UniswapV2Pair};
use crate::infrastructure::data::price_table::PriceTable;
use crate::infrastructure::network::batch::{BatchCaller, CallSpec};
use crate::infrastructure::network::provider::HttpProvider;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::BlockNumberOrTag;
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One physical pool on one venue, reserves oriented to the canonical
/// `(token_a, token_b)` ordering of its parent [`Pool`].
#[derive(Debug, Clone, Serialize)]
pub struct PoolLeg {
    pub venue: String,
    pub router: Address,
    pub pair: Address,
    pub reserve_a: U256,
    pub reserve_b: U256,
    /// reserve_b / reserve_a; ranking only, gates use the integer reserves.
    pub price_ab: f64,
    pub liquidity_usd: f64,
    pub last_update_ts: u32,
}

/// All legs trading the same canonical token pair. `token_a` is the
/// byte-wise smaller address.
#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub token_a: Address,
    pub token_b: Address,
    pub legs: Vec<PoolLeg>,
}

/// A pair address as enumerated from a factory, before metadata is known.
#[derive(Debug, Clone)]
pub struct RawPair {
    pub venue: Venue,
    pub pair: Address,
}

/// Decoded per-pair slots out of the three batched request sets. `None`
/// marks a failed or undecodable slot.
#[derive(Debug, Clone, Default)]
pub struct PairSlots {
    pub token0: Option<Address>,
    pub token1: Option<Address>,
    pub reserves: Option<(U256, U256, u32)>,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub rpc_batch: usize,
    pub min_liq_usd: f64,
    pub stale_seconds: u64,
}

pub struct PoolScanner {
    provider: HttpProvider,
    batch: BatchCaller,
    venues: Vec<Venue>,
    seed_tokens: Vec<(String, Address)>,
    prices: Arc<PriceTable>,
    settings: ScanSettings,
}

impl PoolScanner {
    pub fn new(
        provider: HttpProvider,
        venues: Vec<Venue>,
        seed_tokens: Vec<(String, Address)>,
        prices: Arc<PriceTable>,
        settings: ScanSettings,
    ) -> Self {
        let batch = BatchCaller::new(provider.clone());
        Self {
            provider,
            batch,
            venues,
            seed_tokens,
            prices,
            settings,
        }
    }

    /// One full scan cycle: enumerate pairs on every venue, read metadata
    /// and reserves in batches, filter, and group into canonical pools.
    /// Per-venue and per-pair failures are absorbed; the cycle always
    /// produces a (possibly empty) snapshot.
    pub async fn scan(&self) -> Result<Vec<Pool>, AppError> {
        let raw_pairs = self.discover_pairs().await;
        if raw_pairs.is_empty() {
            tracing::warn!(target: "scanner", "No pairs discovered on any venue");
            return Ok(Vec::new());
        }

        let slots = self.fetch_pair_slots(&raw_pairs).await;
        let latest_ts = self.latest_block_timestamp().await;
        let stale_cutoff = latest_ts.saturating_sub(self.settings.stale_seconds);

        let pools = assemble_pools(
            &raw_pairs,
            &slots,
            stale_cutoff,
            self.settings.min_liq_usd,
            &self.prices,
        );

        tracing::info!(
            target: "scanner",
            pairs = raw_pairs.len(),
            pools = pools.len(),
            legs = pools.iter().map(|p| p.legs.len()).sum::<usize>(),
            "Scan snapshot assembled"
        );
        Ok(pools)
    }

    /// Pair discovery. With a seed token list the scanner asks each factory
    /// for the pair of every unordered token combination; without one it
    /// walks the factory's full pair enumeration.
    async fn discover_pairs(&self) -> Vec<RawPair> {
        let mut out = Vec::new();
        for venue in &self.venues {
            let pairs = if self.seed_tokens.len() >= 2 {
                self.pairs_from_seed_tokens(venue).await
            } else {
                self.pairs_from_enumeration(venue).await
            };
            match pairs {
                Ok(pairs) => {
                    tracing::debug!(
                        target: "scanner",
                        venue = %venue.name,
                        pairs = pairs.len(),
                        "Venue pairs discovered"
                    );
                    out.extend(pairs);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "scanner",
                        venue = %venue.name,
                        error = %e,
                        "Venue discovery failed, skipping venue"
                    );
                }
            }
        }
        out
    }

    async fn pairs_from_seed_tokens(&self, venue: &Venue) -> Result<Vec<RawPair>, AppError> {
        let mut calls = Vec::new();
        for i in 0..self.seed_tokens.len() {
            for j in (i + 1)..self.seed_tokens.len() {
                let data = UniswapV2Factory::getPairCall {
                    tokenA: self.seed_tokens[i].1,
                    tokenB: self.seed_tokens[j].1,
                }
                .abi_encode();
                calls.push(CallSpec::new(venue.factory, data));
            }
        }

        let results = self.batch.batch_call(&calls, self.settings.rpc_batch).await;
        let mut pairs = Vec::new();
        for slot in results.iter().flatten() {
            match UniswapV2Factory::getPairCall::abi_decode_returns(slot) {
                Ok(pair) if pair != Address::ZERO => pairs.push(RawPair {
                    venue: venue.clone(),
                    pair,
                }),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(target: "scanner", venue = %venue.name, error = %e, "getPair decode failed");
                }
            }
        }
        Ok(pairs)
    }

    async fn pairs_from_enumeration(&self, venue: &Venue) -> Result<Vec<RawPair>, AppError> {
        let factory = UniswapV2Factory::new(venue.factory, self.provider.clone());
        let count: U256 = retry_async(
            move |_| {
                let factory = factory.clone();
                async move { factory.allPairsLength().call().await }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Rpc(format!("allPairsLength failed: {}", e)))?;

        let total: u64 = count.try_into().unwrap_or(u64::MAX);
        let count = total.min(MAX_PAIRS_PER_FACTORY);
        if count < total {
            tracing::warn!(
                target: "scanner",
                venue = %venue.name,
                total,
                scanned = count,
                "Factory pair list truncated; configure seed tokens to target pairs"
            );
        }
        let calls: Vec<CallSpec> = (0..count)
            .map(|i| {
                let data = UniswapV2Factory::allPairsCall {
                    index: U256::from(i),
                }
                .abi_encode();
                CallSpec::new(venue.factory, data)
            })
            .collect();

        let results = self.batch.batch_call(&calls, self.settings.rpc_batch).await;
        let mut pairs = Vec::new();
        for slot in results.iter().flatten() {
            if let Ok(pair) = UniswapV2Factory::allPairsCall::abi_decode_returns(slot) {
                if pair != Address::ZERO {
                    pairs.push(RawPair {
                        venue: venue.clone(),
                        pair,
                    });
                }
            }
        }
        Ok(pairs)
    }

    /// Three parallel batched request sets over all pairs, same order.
    async fn fetch_pair_slots(&self, raw_pairs: &[RawPair]) -> Vec<PairSlots> {
        let calls_for = |data: Vec<u8>| -> Vec<CallSpec> {
            raw_pairs
                .iter()
                .map(|rp| CallSpec::new(rp.pair, data.clone()))
                .collect()
        };
        let token0_calls = calls_for(UniswapV2Pair::token0Call {}.abi_encode());
        let token1_calls = calls_for(UniswapV2Pair::token1Call {}.abi_encode());
        let reserves_calls = calls_for(UniswapV2Pair::getReservesCall {}.abi_encode());

        let (token0s, token1s, reserves) = tokio::join!(
            self.batch.batch_call(&token0_calls, self.settings.rpc_batch),
            self.batch.batch_call(&token1_calls, self.settings.rpc_batch),
            self.batch.batch_call(&reserves_calls, self.settings.rpc_batch),
        );

        (0..raw_pairs.len())
            .map(|i| PairSlots {
                token0: decode_address::<UniswapV2Pair::token0Call>(&token0s[i]),
                token1: decode_address::<UniswapV2Pair::token1Call>(&token1s[i]),
                reserves: decode_reserves(&reserves[i]),
            })
            .collect()
    }

    async fn latest_block_timestamp(&self) -> u64 {
        match self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
        {
            Ok(Some(block)) => block.header.timestamp,
            Ok(None) => {
                tracing::warn!(target: "scanner", "Latest block missing, using wall clock");
                current_unix()
            }
            Err(e) => {
                tracing::warn!(target: "scanner", error = %e, "Block fetch failed, using wall clock");
                current_unix()
            }
        }
    }
}

fn decode_address<C>(slot: &Option<Bytes>) -> Option<Address>
where
    C: SolCall<Return = Address>,
{
    let bytes = slot.as_ref()?;
    C::abi_decode_returns(bytes).ok()
}

fn decode_reserves(slot: &Option<Bytes>) -> Option<(U256, U256, u32)> {
    let bytes = slot.as_ref()?;
    let ret = UniswapV2Pair::getReservesCall::abi_decode_returns(bytes).ok()?;
    Some((
        U256::from(ret.reserve0.to::<u128>()),
        U256::from(ret.reserve1.to::<u128>()),
        ret.blockTimestampLast,
    ))
}

/// Pure assembly stage: filter, canonicalize, value, and group decoded
/// pairs into pools. Kept free of I/O so snapshots replay in tests.
pub fn assemble_pools(
    raw_pairs: &[RawPair],
    slots: &[PairSlots],
    stale_cutoff: u64,
    min_liq_usd: f64,
    prices: &PriceTable,
) -> Vec<Pool> {
    let mut pools: Vec<Pool> = Vec::new();
    let mut index_by_key: HashMap<(Address, Address), usize> = HashMap::new();
    let mut universe: Vec<Address> = Vec::new();

    for (raw, slot) in raw_pairs.iter().zip(slots) {
        let (Some(token0), Some(token1), Some((reserve0, reserve1, ts))) =
            (slot.token0, slot.token1, slot.reserves)
        else {
            tracing::debug!(target: "scanner", pair = %raw.pair, "Pair slots incomplete, skipping");
            continue;
        };
        if reserve0.is_zero() || reserve1.is_zero() {
            continue;
        }
        // A zero sync timestamp means the pair never traded.
        if ts == 0 || (ts as u64) < stale_cutoff {
            tracing::debug!(target: "scanner", pair = %raw.pair, ts, "Stale reserves, skipping");
            continue;
        }

        // Canonical ordering: token_a is the smaller address, reserves follow.
        let (token_a, token_b, reserve_a, reserve_b) = if token0 < token1 {
            (token0, token1, reserve0, reserve1)
        } else {
            (token1, token0, reserve1, reserve0)
        };

        if !admit_tokens(&mut universe, token_a, token_b) {
            tracing::debug!(target: "scanner", pair = %raw.pair, "Token universe cap hit, skipping");
            continue;
        }

        let liquidity_usd =
            prices.token_usd(token_a, reserve_a) + prices.token_usd(token_b, reserve_b);
        if liquidity_usd < min_liq_usd {
            continue;
        }

        let price_ab = ratio_f64(reserve_b, reserve_a);
        let leg = PoolLeg {
            venue: raw.venue.name.clone(),
            router: raw.venue.router,
            pair: raw.pair,
            reserve_a,
            reserve_b,
            price_ab,
            liquidity_usd,
            last_update_ts: ts,
        };

        match index_by_key.get(&(token_a, token_b)) {
            Some(&idx) => pools[idx].legs.push(leg),
            None => {
                index_by_key.insert((token_a, token_b), pools.len());
                pools.push(Pool {
                    token_a,
                    token_b,
                    legs: vec![leg],
                });
            }
        }
    }

    pools
}

/// Track the token universe in first-seen order; reject pairs that would
/// push it past the cap.
fn admit_tokens(universe: &mut Vec<Address>, token_a: Address, token_b: Address) -> bool {
    let mut additions = 0usize;
    if !universe.contains(&token_a) {
        additions += 1;
    }
    if token_b != token_a && !universe.contains(&token_b) {
        additions += 1;
    }
    if universe.len() + additions > MAX_TOKENS {
        return false;
    }
    if !universe.contains(&token_a) {
        universe.push(token_a);
    }
    if !universe.contains(&token_b) {
        universe.push(token_b);
    }
    true
}

fn ratio_f64(numerator: U256, denominator: U256) -> f64 {
    let n = numerator.to_string().parse::<f64>().unwrap_or(0.0);
    let d = denominator.to_string().parse::<f64>().unwrap_or(0.0);
    if d == 0.0 {
        0.0
    } else {
        n / d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

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

    fn table() -> PriceTable {
        let prices = StdHashMap::from([("WBNB".to_string(), 580.0), ("BUSD".to_string(), 1.0)]);
        let tokens = vec![
            ("WBNB".to_string(), addr(0x01)),
            ("BUSD".to_string(), addr(0x02)),
        ];
        PriceTable::new(prices, StdHashMap::new(), &tokens)
    }

    fn slot(token0: Address, token1: Address, r0: U256, r1: U256, ts: u32) -> PairSlots {
        PairSlots {
            token0: Some(token0),
            token1: Some(token1),
            reserves: Some((r0, r1, ts)),
        }
    }

    #[test]
    fn orients_reserves_to_canonical_token_order() {
        // The contract reports token0 = the *larger* address here.
        let raw = vec![RawPair {
            venue: venue("pancake", 0x10),
            pair: addr(0xAA),
        }];
        let slots = vec![slot(addr(0x02), addr(0x01), e18(1_000), e18(2_000), 500)];
        let pools = assemble_pools(&raw, &slots, 0, 0.0, &table());

        assert_eq!(pools.len(), 1);
        let pool = &pools[0];
        assert!(pool.token_a < pool.token_b);
        assert_eq!(pool.token_a, addr(0x01));
        // token0 (0x02) held 1_000, so canonical token_a (0x01) holds 2_000.
        assert_eq!(pool.legs[0].reserve_a, e18(2_000));
        assert_eq!(pool.legs[0].reserve_b, e18(1_000));
    }

    #[test]
    fn groups_legs_across_venues_by_token_pair() {
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
            slot(addr(0x01), addr(0x02), e18(1_000), e18(2_000), 500),
            slot(addr(0x01), addr(0x02), e18(1_100), e18(1_900), 500),
        ];
        let pools = assemble_pools(&raw, &slots, 0, 0.0, &table());
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].legs.len(), 2);
        assert_eq!(pools[0].legs[0].venue, "pancake");
        assert_eq!(pools[0].legs[1].venue, "biswap");
    }

    #[test]
    fn drops_stale_and_never_synced_pairs() {
        let raw = vec![
            RawPair {
                venue: venue("pancake", 0x10),
                pair: addr(0xAA),
            },
            RawPair {
                venue: venue("pancake", 0x10),
                pair: addr(0xBB),
            },
        ];
        // First pair last synced at 999_000 with cutoff 999_400; second never.
        let slots = vec![
            slot(addr(0x01), addr(0x02), e18(1_000), e18(1_000), 999_000),
            slot(addr(0x01), addr(0x02), e18(1_000), e18(1_000), 0),
        ];
        let pools = assemble_pools(&raw, &slots, 999_400, 0.0, &table());
        assert!(pools.is_empty());
    }

    #[test]
    fn drops_pools_under_the_liquidity_floor() {
        let raw = vec![RawPair {
            venue: venue("pancake", 0x10),
            pair: addr(0xAA),
        }];
        // 10 WBNB + 5_800 BUSD ≈ $11_600 < $20_000 floor.
        let slots = vec![slot(addr(0x01), addr(0x02), e18(10), e18(5_800), 500)];
        let pools = assemble_pools(&raw, &slots, 0, 20_000.0, &table());
        assert!(pools.is_empty());

        let pools = assemble_pools(&raw, &slots, 0, 10_000.0, &table());
        assert_eq!(pools.len(), 1);
        assert!((pools[0].legs[0].liquidity_usd - 11_600.0).abs() < 1.0);
    }

    #[test]
    fn incomplete_slots_skip_only_their_pair() {
        let raw = vec![
            RawPair {
                venue: venue("pancake", 0x10),
                pair: addr(0xAA),
            },
            RawPair {
                venue: venue("pancake", 0x10),
                pair: addr(0xBB),
            },
        ];
        let slots = vec![
            PairSlots {
                token0: Some(addr(0x01)),
                token1: None,
                reserves: Some((e18(1), e18(1), 500)),
            },
            slot(addr(0x01), addr(0x02), e18(1_000), e18(1_000), 500),
        ];
        let pools = assemble_pools(&raw, &slots, 0, 0.0, &table());
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].legs[0].pair, addr(0xBB));
    }

    #[test]
    fn token_universe_cap_rejects_overflowing_pairs() {
        let mut universe: Vec<Address> = (0..MAX_TOKENS - 1).map(|i| addr_n(i as u32)).collect();
        // One slot left: a pair with one known and one new token fits...
        assert!(admit_tokens(&mut universe, addr_n(0), addr_n(9_999)));
        assert_eq!(universe.len(), MAX_TOKENS);
        // ...but a pair of two brand-new tokens does not.
        assert!(!admit_tokens(&mut universe, addr_n(10_000), addr_n(10_001)));
    }

    fn addr_n(n: u32) -> Address {
        let mut bytes = [0u8; 20];
        bytes[16..20].copy_from_slice(&n.to_be_bytes());
        Address::from(bytes)
    }
}
