//! # Route Ranking & Selection
//!
//! Orders surviving quotes by net economic value to the trader: quoted
//! output minus the gas cost of the route expressed in output-token terms.
//! Subtracting raw gas units from token amounts would mix units, so the gas
//! estimate is first priced via the current gas price and the native-asset
//! spot rate for the output token.

use ethers::types::U256;
use log::warn;
use std::cmp::Ordering;

use crate::error::EngineError;
use crate::types::Quote;
use crate::v3_math::u256_to_f64_lossy;

/// Per-cycle inputs for pricing gas in output-token units.
#[derive(Debug, Clone, Copy)]
pub struct GasCosting {
    pub gas_price_wei: U256,
    /// Output-token raw units per wei of the native asset; `None` when no
    /// conversion path exists, in which case gas is left out of the ranking.
    pub native_to_output_rate: Option<f64>,
}

impl GasCosting {
    pub fn disabled() -> Self {
        Self {
            gas_price_wei: U256::zero(),
            native_to_output_rate: None,
        }
    }

    /// Gas cost of one quote in output-token raw units.
    pub fn cost_in_output(&self, gas_estimate: U256) -> U256 {
        let Some(rate) = self.native_to_output_rate else {
            return U256::zero();
        };
        let cost_wei = gas_estimate.saturating_mul(self.gas_price_wei);
        let cost_out = u256_to_f64_lossy(cost_wei) * rate;
        if !cost_out.is_finite() || cost_out <= 0.0 {
            return U256::zero();
        }
        U256::from(cost_out.min(u128::MAX as f64) as u128)
    }
}

/// A quote with its ranking inputs attached.
#[derive(Debug, Clone)]
pub struct RankedQuote {
    pub quote: Quote,
    pub gas_cost_in_output: U256,
}

impl RankedQuote {
    pub fn net_output(&self) -> U256 {
        self.quote.amount_out.saturating_sub(self.gas_cost_in_output)
    }
}

/// Drops zero quotes and sorts the rest by descending net output. The top
/// entry is the default selection; all entries stay available for manual
/// override.
pub fn rank(quotes: Vec<Quote>, costing: &GasCosting) -> Result<Vec<RankedQuote>, EngineError> {
    if costing.native_to_output_rate.is_none() && !quotes.is_empty() {
        warn!("no native-to-output conversion available; ranking by raw output");
    }

    let mut ranked: Vec<RankedQuote> = quotes
        .into_iter()
        .filter(|q| !q.amount_out.is_zero())
        .map(|quote| RankedQuote {
            gas_cost_in_output: costing.cost_in_output(quote.gas_estimate),
            quote,
        })
        .collect();

    if ranked.is_empty() {
        return Err(EngineError::NoValidQuote);
    }

    ranked.sort_by(|a, b| {
        b.net_output()
            .cmp(&a.net_output())
            .then_with(|| b.quote.amount_out.cmp(&a.quote.amount_out))
            .then_with(|| hops_order(a, b))
    });
    Ok(ranked)
}

fn hops_order(a: &RankedQuote, b: &RankedQuote) -> Ordering {
    a.quote.path.hops().cmp(&b.quote.path.hops())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidatePath;
    use ethers::types::Address;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn quote(amount_out: u64, gas_estimate: u64, hops: usize) -> Quote {
        let path = if hops == 1 {
            CandidatePath::single(addr(1), addr(2), 3000)
        } else {
            CandidatePath::multi(vec![addr(1), addr(9), addr(2)], vec![500, 3000]).unwrap()
        };
        Quote {
            path,
            pools: vec![],
            amount_out: U256::from(amount_out),
            price_impact_pct: 0.0,
            gas_estimate: U256::from(gas_estimate),
        }
    }

    fn unit_costing() -> GasCosting {
        GasCosting {
            gas_price_wei: U256::one(),
            native_to_output_rate: Some(1.0),
        }
    }

    #[test]
    fn zero_quotes_are_dropped() {
        let ranked = rank(vec![quote(0, 100, 1), quote(500, 100, 1)], &unit_costing()).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].quote.amount_out, U256::from(500u64));
    }

    #[test]
    fn empty_set_is_a_no_valid_quote_error() {
        let err = rank(vec![quote(0, 100, 1)], &unit_costing()).unwrap_err();
        assert!(matches!(err, EngineError::NoValidQuote));
    }

    #[test]
    fn net_value_beats_raw_output() {
        // Larger headline output loses to a cheaper route once gas is priced in.
        let expensive = quote(1_000, 600, 2);
        let cheap = quote(900, 100, 1);
        let ranked = rank(vec![expensive, cheap], &unit_costing()).unwrap();
        assert_eq!(ranked[0].quote.amount_out, U256::from(900u64));
        assert_eq!(ranked[0].net_output(), U256::from(800u64));
        assert_eq!(ranked[1].net_output(), U256::from(400u64));
    }

    #[test]
    fn ordering_is_monotone_in_net_output() {
        let ranked = rank(
            vec![quote(500, 50, 1), quote(800, 100, 2), quote(700, 10, 1)],
            &unit_costing(),
        )
        .unwrap();
        for pair in ranked.windows(2) {
            assert!(pair[0].net_output() >= pair[1].net_output());
        }
    }

    #[test]
    fn missing_rate_ranks_by_raw_output() {
        let ranked = rank(
            vec![quote(900, 1_000_000, 1), quote(800, 10, 1)],
            &GasCosting::disabled(),
        )
        .unwrap();
        assert_eq!(ranked[0].quote.amount_out, U256::from(900u64));
        assert_eq!(ranked[0].gas_cost_in_output, U256::zero());
    }

    #[test]
    fn gas_cost_conversion_scales_by_rate() {
        let costing = GasCosting {
            gas_price_wei: U256::from(2u64),
            native_to_output_rate: Some(0.5),
        };
        assert_eq!(
            costing.cost_in_output(U256::from(100u64)),
            U256::from(100u64)
        );
    }
}
