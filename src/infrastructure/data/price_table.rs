// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

/// Static USD quote table. Prices are configuration, not an oracle: they
/// only feed threshold comparisons (liquidity floor, profit-vs-gas gates),
/// never trade sizing.
pub struct PriceTable {
    prices_by_symbol: HashMap<String, f64>,
    decimals_by_symbol: HashMap<String, u8>,
    symbols_by_address: HashMap<Address, String>,
}

impl PriceTable {
    pub fn new(
        prices_by_symbol: HashMap<String, f64>,
        decimals_by_symbol: HashMap<String, u8>,
        tokens: &[(String, Address)],
    ) -> Self {
        let prices_by_symbol = prices_by_symbol
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        let decimals_by_symbol = decimals_by_symbol
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        let symbols_by_address = tokens
            .iter()
            .map(|(sym, addr)| (*addr, sym.to_uppercase()))
            .collect();
        Self {
            prices_by_symbol,
            decimals_by_symbol,
            symbols_by_address,
        }
    }

    pub fn symbol_of(&self, token: Address) -> Option<&str> {
        self.symbols_by_address.get(&token).map(String::as_str)
    }

    pub fn decimals_of(&self, symbol: &str) -> u8 {
        self.decimals_by_symbol
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(18)
    }

    pub fn usd_price(&self, symbol: &str) -> Option<f64> {
        self.prices_by_symbol.get(&symbol.to_uppercase()).copied()
    }

    /// USD value of a raw token amount; 0 for tokens without a quote.
    pub fn token_usd(&self, token: Address, amount: U256) -> f64 {
        let Some(symbol) = self.symbol_of(token) else {
            return 0.0;
        };
        self.symbol_usd(symbol, amount)
    }

    /// USD value of a raw amount of a known symbol; 0 without a quote.
    pub fn symbol_usd(&self, symbol: &str, amount: U256) -> f64 {
        let Some(price) = self.usd_price(symbol) else {
            return 0.0;
        };
        let decimals = self.decimals_of(symbol);
        units(amount, decimals) * price
    }
}

/// Lossy conversion from base units to a float token count. Fine for
/// thresholds and ranking; never used for exact profit math.
fn units(amount: U256, decimals: u8) -> f64 {
    let raw = amount.to_string().parse::<f64>().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}
