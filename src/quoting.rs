//! # Route Quoting
//!
//! Simulates every candidate path against the external quoter: single-hop
//! candidates through the single-pool quote call, multi-hop candidates
//! through one packed-path call that chains the hops atomically. Pool state
//! is read fresh each cycle to compute the spot-implied theoretical output,
//! from which the signed price impact is derived. A failing path is dropped
//! silently; one bad route never aborts the cycle.

use ethers::types::U256;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::{PathQuoter, PoolStateReader};
use crate::metrics;
use crate::types::{Candidate, CandidatePath, PoolInfo, Quote};
use crate::v3_math;

pub struct RouteQuoter {
    quoter: Arc<dyn PathQuoter>,
    state: Arc<dyn PoolStateReader>,
}

impl RouteQuoter {
    pub fn new(quoter: Arc<dyn PathQuoter>, state: Arc<dyn PoolStateReader>) -> Self {
        Self { quoter, state }
    }

    /// Quotes one candidate. Returns `None` on any simulation or state-read
    /// failure for this path.
    pub async fn quote(&self, candidate: &Candidate, amount_in: U256) -> Option<Quote> {
        let states = join_all(
            candidate
                .pools
                .iter()
                .map(|&pool| self.state.pool_state(pool)),
        )
        .await;

        let mut pools = Vec::with_capacity(states.len());
        for state in states {
            match state {
                Ok(info) => pools.push(info),
                Err(e) => {
                    debug!("pool state read failed, dropping path: {e}");
                    metrics::increment_quote_failure("pool_state");
                    return None;
                }
            }
        }

        let simulated = match &candidate.path {
            CandidatePath::SingleHop {
                token_in,
                token_out,
                fee,
            } => {
                self.quoter
                    .quote_single(*token_in, *token_out, *fee, amount_in)
                    .await
            }
            path @ CandidatePath::MultiHop { .. } => {
                let encoded = path.encode();
                debug!("quoting path 0x{}", hex::encode(&encoded));
                self.quoter.quote_path(encoded, amount_in).await
            }
        };

        let (amount_out, gas_estimate) = match simulated {
            Ok(result) => result,
            Err(e) => {
                debug!("quote simulation reverted, dropping path: {e}");
                metrics::increment_quote_failure("simulation");
                return None;
            }
        };

        let price_impact_pct = price_impact(&candidate.path, &pools, amount_in, amount_out);

        Some(Quote {
            path: candidate.path.clone(),
            pools,
            amount_out,
            price_impact_pct,
            gas_estimate,
        })
    }

    /// Quotes all candidates concurrently; survivors only.
    pub async fn quote_all(&self, candidates: &[Candidate], amount_in: U256) -> Vec<Quote> {
        let quotes: Vec<Quote> = join_all(
            candidates
                .iter()
                .map(|candidate| self.quote(candidate, amount_in)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();
        debug!("{} of {} candidate(s) produced a quote", quotes.len(), candidates.len());
        quotes
    }
}

/// Signed price impact in percent: quoted output versus the output implied by
/// the pools' pre-trade spot prices. Negative means the simulation realized
/// less than spot, i.e. the price moved against the trader.
fn price_impact(
    path: &CandidatePath,
    pools: &[PoolInfo],
    amount_in: U256,
    amount_out: U256,
) -> f64 {
    let tokens = path.tokens();
    let mut theoretical = v3_math::u256_to_f64_lossy(amount_in);
    for (hop, pool) in pools.iter().enumerate() {
        theoretical *= v3_math::hop_spot_rate(pool.token0, tokens[hop], pool.sqrt_price_x96);
    }
    if theoretical <= 0.0 || !theoretical.is_finite() {
        return 0.0;
    }
    let quoted = v3_math::u256_to_f64_lossy(amount_out);
    let impact = (quoted / theoretical - 1.0) * 100.0;
    impact.clamp(-100.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use ethers::types::{Address, Bytes};
    use std::collections::HashMap;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    struct FixedQuoter {
        /// amount_out per single-hop fee; empty means revert.
        single: HashMap<u32, U256>,
        path_out: Option<U256>,
    }

    #[async_trait]
    impl PathQuoter for FixedQuoter {
        async fn quote_single(
            &self,
            _token_in: Address,
            _token_out: Address,
            fee: u32,
            _amount_in: U256,
        ) -> Result<(U256, U256)> {
            match self.single.get(&fee) {
                Some(&out) => Ok((out, U256::from(90_000u64))),
                None => bail!("execution reverted"),
            }
        }

        async fn quote_path(&self, _path: Bytes, _amount_in: U256) -> Result<(U256, U256)> {
            match self.path_out {
                Some(out) => Ok((out, U256::from(180_000u64))),
                None => bail!("execution reverted"),
            }
        }
    }

    struct FlatStateReader;

    #[async_trait]
    impl PoolStateReader for FlatStateReader {
        async fn pool_state(&self, pool: Address) -> Result<PoolInfo> {
            Ok(PoolInfo {
                address: pool,
                token0: addr(1),
                token1: addr(2),
                fee: 3000,
                liquidity: 1_000_000,
                sqrt_price_x96: v3_math::Q96,
            })
        }
    }

    fn candidate_single(fee: u32) -> Candidate {
        Candidate {
            path: CandidatePath::single(addr(1), addr(2), fee),
            pools: vec![addr(0xA0)],
        }
    }

    #[tokio::test]
    async fn reverted_paths_drop_without_aborting_others() {
        let quoter = RouteQuoter::new(
            Arc::new(FixedQuoter {
                single: HashMap::from([(500, U256::from(950u64))]),
                path_out: None,
            }),
            Arc::new(FlatStateReader),
        );
        let candidates = vec![candidate_single(500), candidate_single(3000)];
        let quotes = quoter.quote_all(&candidates, U256::from(1000u64)).await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].amount_out, U256::from(950u64));
        assert_eq!(quotes[0].gas_estimate, U256::from(90_000u64));
    }

    #[tokio::test]
    async fn multi_hop_uses_the_path_quote() {
        let quoter = RouteQuoter::new(
            Arc::new(FixedQuoter {
                single: HashMap::new(),
                path_out: Some(U256::from(880u64)),
            }),
            Arc::new(FlatStateReader),
        );
        let candidate = Candidate {
            path: CandidatePath::multi(vec![addr(1), addr(9), addr(2)], vec![500, 3000]).unwrap(),
            pools: vec![addr(0xB0), addr(0xB1)],
        };
        let quote = quoter.quote(&candidate, U256::from(1000u64)).await.unwrap();
        assert_eq!(quote.amount_out, U256::from(880u64));
        assert_eq!(quote.pools.len(), 2);
    }

    #[test]
    fn price_impact_is_negative_when_quote_trails_spot() {
        // Spot price 1:1, quoted 950 for 1000 in -> -5%.
        let path = CandidatePath::single(addr(1), addr(2), 3000);
        let pools = vec![PoolInfo {
            address: addr(0xA0),
            token0: addr(1),
            token1: addr(2),
            fee: 3000,
            liquidity: 1,
            sqrt_price_x96: v3_math::Q96,
        }];
        let impact = price_impact(
            &path,
            &pools,
            U256::from(1000u64),
            U256::from(950u64),
        );
        assert!((impact + 5.0).abs() < 1e-9);
    }

    #[test]
    fn price_impact_handles_degenerate_spot() {
        let path = CandidatePath::single(addr(1), addr(2), 3000);
        let pools = vec![PoolInfo {
            sqrt_price_x96: U256::zero(),
            ..PoolInfo::default()
        }];
        assert_eq!(
            price_impact(&path, &pools, U256::from(1000u64), U256::from(950u64)),
            0.0
        );
    }
}
