// Q96 price math used to derive spot rates for price-impact and gas-cost
// conversion. Quoting itself goes through the on-chain quoter; nothing here
// simulates tick crossings.
use ethers::types::{Address, U256};

/// 2^96 fixed-point scale used by sqrtPriceX96.
pub const Q96: U256 = U256([0, 0, 4294967296, 0]);

/// Lossy conversion of U256 to f64 via a decimal mantissa/exponent split,
/// avoiding intermediate u128 casts that overflow for large prices.
pub fn u256_to_f64_lossy(v: U256) -> f64 {
    if v.is_zero() {
        return 0.0;
    }
    let s = v.to_string();
    let len = s.len();
    let take = len.min(18);
    let (mantissa_str, _rest) = s.split_at(take);
    let mantissa = mantissa_str.parse::<f64>().unwrap_or(0.0);
    let exp10 = (len - take) as i32;
    mantissa * 10f64.powi(exp10)
}

/// Spot price token1/token0 in raw units: `(sqrtPriceX96 / 2^96)^2`.
pub fn sqrt_price_to_price(sqrt_price_x96: U256) -> f64 {
    if sqrt_price_x96.is_zero() {
        return 0.0;
    }
    let sqrt = u256_to_f64_lossy(sqrt_price_x96);
    let q96 = u256_to_f64_lossy(Q96);
    let ratio = sqrt / q96;
    ratio * ratio
}

pub fn is_zero_for_one(token_in: Address, token0: Address) -> bool {
    token_in == token0
}

/// Raw-unit spot rate for one hop, oriented by trade direction: output raw
/// units per input raw unit, ignoring fee and impact.
pub fn hop_spot_rate(pool_token0: Address, token_in: Address, sqrt_price_x96: U256) -> f64 {
    let price10 = sqrt_price_to_price(sqrt_price_x96);
    if price10 == 0.0 {
        return 0.0;
    }
    if is_zero_for_one(token_in, pool_token0) {
        price10
    } else {
        1.0 / price10
    }
}
