// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::services::scanner::Pool;
use alloy::primitives::{Address, U256};

/// Directed liquidity edge, a value-type snapshot of one pool leg's
/// reserves. Rebuilt every scan; nothing is shared across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub token_in: Address,
    pub token_out: Address,
    pub venue: String,
    pub router: Address,
    pub pair: Address,
    pub reserve_in: U256,
    pub reserve_out: U256,
}

/// Flat edge list in insertion order. Adjacency is a filtered scan, which
/// keeps enumeration deterministic for identical inputs.
#[derive(Debug, Clone, Default)]
pub struct TokenGraph {
    edges: Vec<Edge>,
    tokens: Vec<Address>,
}

impl TokenGraph {
    /// Each pool leg contributes both directions.
    pub fn from_pools(pools: &[Pool]) -> Self {
        let mut graph = TokenGraph::default();
        for pool in pools {
            for leg in &pool.legs {
                graph.insert(Edge {
                    token_in: pool.token_a,
                    token_out: pool.token_b,
                    venue: leg.venue.clone(),
                    router: leg.router,
                    pair: leg.pair,
                    reserve_in: leg.reserve_a,
                    reserve_out: leg.reserve_b,
                });
                graph.insert(Edge {
                    token_in: pool.token_b,
                    token_out: pool.token_a,
                    venue: leg.venue.clone(),
                    router: leg.router,
                    pair: leg.pair,
                    reserve_in: leg.reserve_b,
                    reserve_out: leg.reserve_a,
                });
            }
        }
        graph
    }

    fn insert(&mut self, edge: Edge) {
        if !self.tokens.contains(&edge.token_in) {
            self.tokens.push(edge.token_in);
        }
        if !self.tokens.contains(&edge.token_out) {
            self.tokens.push(edge.token_out);
        }
        self.edges.push(edge);
    }

    /// Tokens in first-seen order.
    pub fn tokens(&self) -> &[Address] {
        &self.tokens
    }

    pub fn out_edges(&self, token: Address) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.token_in == token)
    }

    pub fn out_degree(&self, token: Address) -> usize {
        self.out_edges(token).count()
    }

    /// Depth-limited DFS for simple cycles anchored at `start`: no token
    /// repeats except the start as the final vertex, 2..=`max_hops` edges.
    pub fn cycles_from(&self, start: Address, max_hops: usize) -> Vec<Vec<Edge>> {
        let mut cycles = Vec::new();
        if max_hops < 2 {
            return cycles;
        }
        let mut path: Vec<Edge> = Vec::with_capacity(max_hops);
        let mut visited: Vec<Address> = vec![start];
        self.dfs(start, start, max_hops, &mut path, &mut visited, &mut cycles);
        cycles
    }

    fn dfs(
        &self,
        start: Address,
        current: Address,
        max_hops: usize,
        path: &mut Vec<Edge>,
        visited: &mut Vec<Address>,
        cycles: &mut Vec<Vec<Edge>>,
    ) {
        for edge in self.out_edges(current) {
            if edge.token_out == start {
                if path.len() + 1 >= 2 {
                    let mut cycle = path.clone();
                    cycle.push(edge.clone());
                    cycles.push(cycle);
                }
                continue;
            }
            if path.len() + 1 >= max_hops {
                continue;
            }
            if visited.contains(&edge.token_out) {
                continue;
            }
            // Dead end: nothing leaves this token, the cycle cannot close.
            if self.out_degree(edge.token_out) == 0 {
                continue;
            }

            path.push(edge.clone());
            visited.push(edge.token_out);
            self.dfs(start, edge.token_out, max_hops, path, visited, cycles);
            visited.pop();
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scanner::PoolLeg;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn leg(venue: &str, seed: u8, reserve_a: u64, reserve_b: u64) -> PoolLeg {
        PoolLeg {
            venue: venue.to_string(),
            router: addr(seed),
            pair: addr(seed + 1),
            reserve_a: U256::from(reserve_a),
            reserve_b: U256::from(reserve_b),
            price_ab: reserve_b as f64 / reserve_a as f64,
            liquidity_usd: 1_000_000.0,
            last_update_ts: 1,
        }
    }

    fn pool(a: u8, b: u8, legs: Vec<PoolLeg>) -> Pool {
        Pool {
            token_a: addr(a),
            token_b: addr(b),
            legs,
        }
    }

    #[test]
    fn each_leg_emits_two_directed_edges() {
        let pools = vec![pool(1, 2, vec![leg("pancake", 0x10, 100, 200)])];
        let graph = TokenGraph::from_pools(&pools);
        assert_eq!(graph.out_degree(addr(1)), 1);
        assert_eq!(graph.out_degree(addr(2)), 1);

        let forward = graph.out_edges(addr(1)).next().unwrap();
        assert_eq!(forward.reserve_in, U256::from(100u64));
        assert_eq!(forward.reserve_out, U256::from(200u64));
        let back = graph.out_edges(addr(2)).next().unwrap();
        assert_eq!(back.reserve_in, U256::from(200u64));
        assert_eq!(back.reserve_out, U256::from(100u64));
    }

    #[test]
    fn two_venue_pair_yields_two_edge_cycles() {
        // Smallest searchable cycle: A→B on one venue, B→A on the other.
        let pools = vec![pool(
            1,
            2,
            vec![leg("pancake", 0x10, 100, 200), leg("biswap", 0x20, 100, 190)],
        )];
        let graph = TokenGraph::from_pools(&pools);
        let cycles = graph.cycles_from(addr(1), 3);

        assert!(!cycles.is_empty());
        assert!(cycles.iter().all(|c| c.len() >= 2));
        // Cross-venue round trips exist among them.
        assert!(cycles
            .iter()
            .any(|c| c.len() == 2 && c[0].venue != c[1].venue));
    }

    #[test]
    fn triangle_is_found_and_well_formed() {
        let pools = vec![
            pool(1, 2, vec![leg("pancake", 0x10, 100, 200)]),
            pool(2, 3, vec![leg("biswap", 0x20, 100, 300)]),
            pool(1, 3, vec![leg("ape", 0x30, 100, 400)]),
        ];
        let graph = TokenGraph::from_pools(&pools);
        let cycles = graph.cycles_from(addr(1), 3);
        let triangles: Vec<_> = cycles.iter().filter(|c| c.len() == 3).collect();
        assert_eq!(triangles.len(), 2, "both orientations of the triangle");

        for cycle in triangles {
            // Path invariant: consecutive edges chain, and the cycle closes.
            for pair in cycle.windows(2) {
                assert_eq!(pair[0].token_out, pair[1].token_in);
            }
            assert_eq!(cycle[0].token_in, addr(1));
            assert_eq!(cycle.last().unwrap().token_out, addr(1));
        }
    }

    #[test]
    fn no_token_repeats_within_a_cycle() {
        let pools = vec![
            pool(1, 2, vec![leg("pancake", 0x10, 100, 200)]),
            pool(2, 3, vec![leg("biswap", 0x20, 100, 300)]),
            pool(2, 4, vec![leg("ape", 0x30, 100, 400)]),
            pool(1, 3, vec![leg("ape", 0x40, 100, 400)]),
        ];
        let graph = TokenGraph::from_pools(&pools);
        for cycle in graph.cycles_from(addr(1), 3) {
            let mut seen: Vec<Address> = cycle.iter().map(|e| e.token_in).collect();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), cycle.len(), "interior tokens must be unique");
        }
    }

    #[test]
    fn enumeration_is_deterministic() {
        let pools = vec![
            pool(1, 2, vec![leg("pancake", 0x10, 100, 200)]),
            pool(2, 3, vec![leg("biswap", 0x20, 100, 300)]),
            pool(1, 3, vec![leg("ape", 0x30, 100, 400)]),
        ];
        let graph = TokenGraph::from_pools(&pools);
        let first = graph.cycles_from(addr(1), 3);
        let second = graph.cycles_from(addr(1), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn single_leg_pair_only_yields_round_trips() {
        let pools = vec![pool(1, 2, vec![leg("pancake", 0x10, 100, 200)])];
        let graph = TokenGraph::from_pools(&pools);
        // A→B→A through the same pair is still a cycle by the path rules;
        // the finder is the layer that prices it away (fee makes it a loss).
        let cycles = graph.cycles_from(addr(1), 3);
        assert!(cycles.iter().all(|c| c.len() == 2));
    }
}
