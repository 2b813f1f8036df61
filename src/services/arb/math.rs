// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::types::SwapFee;
use alloy::primitives::U256;

/// Constant-product swap output with fee, floor division:
///
/// ```text
/// in_with_fee = amount_in * fee.num
/// out         = in_with_fee * reserve_out / (reserve_in * fee.den + in_with_fee)
/// ```
///
/// Zero in any input yields zero out. All arithmetic stays in 256 bits;
/// an overflowing intermediate (unreachable for uint112 reserves) also
/// yields zero rather than a truncated product.
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee: SwapFee) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }

    let Some(in_with_fee) = amount_in.checked_mul(U256::from(fee.num)) else {
        return U256::ZERO;
    };
    let Some(numerator) = in_with_fee.checked_mul(reserve_out) else {
        return U256::ZERO;
    };
    let Some(scaled_reserve) = reserve_in.checked_mul(U256::from(fee.den)) else {
        return U256::ZERO;
    };
    let denominator = scaled_reserve.saturating_add(in_with_fee);
    numerator / denominator
}
