//! # Core Types
//!
//! Data model for the routing engine: token metadata, pool snapshots,
//! candidate paths, quotes and ranked routes.

use ethers::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Resolved ERC-20 metadata. Immutable once resolved; cached by the
/// [`TokenResolver`](crate::token_resolver::TokenResolver) for the process
/// lifetime or a configured TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub name: Option<String>,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            name: None,
        }
    }
}

/// Point-in-time snapshot of a concentrated-liquidity pool.
///
/// Read fresh every quoting cycle; liquidity and price move every block, so
/// snapshots are never cached across cycles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PoolInfo {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// Fee in pips (hundredths of a basis point): 500 = 0.05%.
    pub fee: u32,
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
}

/// A structural trade path: which tokens, through which fee tiers.
///
/// Single-hop and multi-hop paths need different encodings for the quoter and
/// router calls, so the distinction is carried in the type rather than
/// re-derived from a length check at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePath {
    SingleHop {
        token_in: Address,
        token_out: Address,
        fee: u32,
    },
    MultiHop {
        /// Token sequence, length 3..=4.
        tokens: Vec<Address>,
        /// Fee per hop, length `tokens.len() - 1`.
        fees: Vec<u32>,
    },
}

impl CandidatePath {
    pub fn single(token_in: Address, token_out: Address, fee: u32) -> Self {
        Self::SingleHop {
            token_in,
            token_out,
            fee,
        }
    }

    /// Builds a multi-hop path, enforcing `fees.len() == tokens.len() - 1`.
    pub fn multi(tokens: Vec<Address>, fees: Vec<u32>) -> Result<Self, EngineError> {
        if tokens.len() < 3 {
            return Err(EngineError::InvalidRequest(
                "multi-hop path needs at least one intermediary",
            ));
        }
        if fees.len() + 1 != tokens.len() {
            return Err(EngineError::InvalidRequest(
                "fee count must be token count minus one",
            ));
        }
        Ok(Self::MultiHop { tokens, fees })
    }

    pub fn tokens(&self) -> Vec<Address> {
        match self {
            Self::SingleHop {
                token_in,
                token_out,
                ..
            } => vec![*token_in, *token_out],
            Self::MultiHop { tokens, .. } => tokens.clone(),
        }
    }

    pub fn fees(&self) -> Vec<u32> {
        match self {
            Self::SingleHop { fee, .. } => vec![*fee],
            Self::MultiHop { fees, .. } => fees.clone(),
        }
    }

    pub fn token_in(&self) -> Address {
        match self {
            Self::SingleHop { token_in, .. } => *token_in,
            Self::MultiHop { tokens, .. } => tokens[0],
        }
    }

    pub fn token_out(&self) -> Address {
        match self {
            Self::SingleHop { token_out, .. } => *token_out,
            Self::MultiHop { tokens, .. } => tokens[tokens.len() - 1],
        }
    }

    pub fn hops(&self) -> usize {
        self.fees().len()
    }

    /// Packed path encoding for `quoteExactInput` / `exactInput`:
    /// `token(20) | fee(3) | token(20) | fee(3) | ... | token(20)`.
    pub fn encode(&self) -> Bytes {
        let tokens = self.tokens();
        let fees = self.fees();
        let mut out = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
        for (i, token) in tokens.iter().enumerate() {
            out.extend_from_slice(token.as_bytes());
            if let Some(fee) = fees.get(i) {
                out.extend_from_slice(&fee.to_be_bytes()[1..]);
            }
        }
        Bytes::from(out)
    }
}

/// A discovered candidate: the structural path plus the pool address backing
/// each hop. Produced by discovery, consumed by quoting.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: CandidatePath,
    pub pools: Vec<Address>,
}

/// A successfully simulated candidate, prior to ranking.
#[derive(Debug, Clone)]
pub struct Quote {
    pub path: CandidatePath,
    pub pools: Vec<PoolInfo>,
    pub amount_out: U256,
    /// Signed percentage; negative means the realized price moved against the
    /// trader relative to the pre-trade spot.
    pub price_impact_pct: f64,
    /// Gas units reported by the quote simulation.
    pub gas_estimate: U256,
}

/// A ranked, caller-facing route.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: Vec<TokenInfo>,
    pub fees: Vec<u32>,
    pub pools: Vec<PoolInfo>,
    pub candidate: CandidatePath,
    pub amount_out: U256,
    /// `amount_out` scaled by the output token's decimals.
    pub formatted_out: String,
    pub price_impact_pct: f64,
    pub gas_estimate: U256,
    /// Gas cost converted into output-token raw units; zero when no
    /// conversion rate was available for the cycle.
    pub gas_cost_in_output: U256,
}

impl Route {
    /// Net economic value used for ranking.
    pub fn net_output(&self) -> U256 {
        self.amount_out.saturating_sub(self.gas_cost_in_output)
    }
}

/// Caller-supplied swap intent. Immutable for the duration of one quoting
/// cycle; changing any field starts a new cycle and invalidates the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    /// Slippage tolerance in basis points (50 = 0.50%).
    pub slippage_bps: u32,
    pub deadline_minutes: u64,
    pub recipient: Address,
}

impl SwapRequest {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.token_in == self.token_out {
            return Err(EngineError::InvalidRequest(
                "token_in and token_out are identical",
            ));
        }
        if self.amount_in.is_zero() {
            return Err(EngineError::InvalidRequest("amount_in is zero"));
        }
        if self.slippage_bps > 10_000 {
            return Err(EngineError::InvalidRequest(
                "slippage tolerance exceeds 100%",
            ));
        }
        Ok(())
    }

    /// Slippage floor: `quoted * (10_000 - slippage_bps) / 10_000`.
    ///
    /// Always <= `quoted`, so the router is never handed a minimum above the
    /// quoted output.
    pub fn amount_out_minimum(&self, quoted: U256) -> U256 {
        quoted * U256::from(10_000 - self.slippage_bps) / U256::from(10_000)
    }

    /// Absolute unix deadline for the router call.
    pub fn deadline_from(&self, now_unix: u64) -> U256 {
        U256::from(now_unix + self.deadline_minutes * 60)
    }
}

/// Formats a raw amount with the given decimals, trimming trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
    let raw = amount.to_string();
    match Decimal::from_str_exact(&raw) {
        Ok(mut d) => {
            d.set_scale(decimals as u32).unwrap_or(());
            d.normalize().to_string()
        }
        // Falls back to raw units for amounts beyond Decimal's 96-bit range.
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn multi_hop_enforces_fee_length() {
        let tokens = vec![addr(1), addr(2), addr(3)];
        assert!(CandidatePath::multi(tokens.clone(), vec![500, 3000]).is_ok());
        assert!(CandidatePath::multi(tokens.clone(), vec![500]).is_err());
        assert!(CandidatePath::multi(vec![addr(1), addr(2)], vec![500]).is_err());
    }

    #[test]
    fn encode_packs_tokens_and_fees() {
        let path = CandidatePath::multi(vec![addr(1), addr(2), addr(3)], vec![500, 3000]).unwrap();
        let encoded = path.encode();
        assert_eq!(encoded.len(), 20 + 3 + 20 + 3 + 20);
        assert_eq!(&encoded[0..20], addr(1).as_bytes());
        // 500 = 0x0001f4 as a 3-byte big-endian fee
        assert_eq!(&encoded[20..23], &[0x00, 0x01, 0xf4]);
        assert_eq!(&encoded[23..43], addr(2).as_bytes());
        assert_eq!(&encoded[43..46], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&encoded[46..66], addr(3).as_bytes());
    }

    #[test]
    fn single_hop_encoding_matches_token_fee_token() {
        let path = CandidatePath::single(addr(9), addr(7), 10_000);
        let encoded = path.encode();
        assert_eq!(encoded.len(), 43);
        assert_eq!(&encoded[20..23], &[0x00, 0x27, 0x10]);
    }

    #[test]
    fn slippage_floor_never_exceeds_quote() {
        let req = SwapRequest {
            token_in: addr(1),
            token_out: addr(2),
            amount_in: U256::from(1_000u64),
            slippage_bps: 50,
            deadline_minutes: 20,
            recipient: addr(3),
        };
        let quoted = U256::from(1_000_000u64);
        let floor = req.amount_out_minimum(quoted);
        assert_eq!(floor, U256::from(995_000u64));
        assert!(floor <= quoted);

        let zero_tolerance = SwapRequest {
            slippage_bps: 0,
            ..req.clone()
        };
        assert_eq!(zero_tolerance.amount_out_minimum(quoted), quoted);

        let full_tolerance = SwapRequest {
            slippage_bps: 10_000,
            ..req
        };
        assert_eq!(full_tolerance.amount_out_minimum(quoted), U256::zero());
    }

    #[test]
    fn request_validation() {
        let mut req = SwapRequest {
            token_in: addr(1),
            token_out: addr(1),
            amount_in: U256::from(1u64),
            slippage_bps: 50,
            deadline_minutes: 20,
            recipient: addr(3),
        };
        assert!(req.validate().is_err());
        req.token_out = addr(2);
        assert!(req.validate().is_ok());
        req.amount_in = U256::zero();
        assert!(req.validate().is_err());
        req.amount_in = U256::one();
        req.slippage_bps = 10_001;
        assert!(req.validate().is_err());
    }

    #[test]
    fn format_amount_scales_by_decimals() {
        assert_eq!(
            format_token_amount(U256::from(1_500_000u64), 6),
            "1.5".to_string()
        );
        assert_eq!(format_token_amount(U256::from(950u64), 0), "950");
        let wei = U256::from_dec_str("1000000000000000000").unwrap();
        assert_eq!(format_token_amount(wei, 18), "1");
    }

    #[test]
    fn route_net_output_saturates() {
        let route = Route {
            path: vec![],
            fees: vec![3000],
            pools: vec![],
            candidate: CandidatePath::single(addr(1), addr(2), 3000),
            amount_out: U256::from(100u64),
            formatted_out: "100".into(),
            price_impact_pct: -0.1,
            gas_estimate: U256::from(90_000u64),
            gas_cost_in_output: U256::from(150u64),
        };
        assert_eq!(route.net_output(), U256::zero());
    }

    #[test]
    fn deadline_is_absolute_seconds() {
        let req = SwapRequest {
            token_in: addr(1),
            token_out: addr(2),
            amount_in: U256::one(),
            slippage_bps: 50,
            deadline_minutes: 20,
            recipient: Address::from_str("0x000000000000000000000000000000000000dEaD").unwrap(),
        };
        assert_eq!(req.deadline_from(1_700_000_000), U256::from(1_700_001_200u64));
    }
}
