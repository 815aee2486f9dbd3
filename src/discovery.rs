//! # Route Discovery
//!
//! Enumerates candidate trade paths between two tokens: direct pools across
//! the configured fee tiers, two-hop paths through common base tokens, and a
//! three-hop fallback through two distinct bases when nothing shorter
//! connects. All existence checks against the registry are fanned out
//! concurrently; discovery neither quotes nor ranks.

use ethers::types::Address;
use futures::future::join_all;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::PoolRegistry;
use crate::settings::Routing;
use crate::types::{Candidate, CandidatePath};

pub struct RouteDiscovery {
    registry: Arc<dyn PoolRegistry>,
    fee_tiers: Vec<u32>,
    base_tokens: Vec<Address>,
    fallback_fee: u32,
    exhaustive_three_hop: bool,
}

impl RouteDiscovery {
    pub fn new(registry: Arc<dyn PoolRegistry>, routing: &Routing) -> Self {
        Self {
            registry,
            fee_tiers: routing.fee_tiers.clone(),
            base_tokens: routing.base_tokens.clone(),
            fallback_fee: routing.fallback_fee,
            exhaustive_three_hop: routing.exhaustive_three_hop,
        }
    }

    /// A failed existence check is treated as absence; one flaky lookup must
    /// not abort the rest of the cycle.
    async fn exists(&self, token_a: Address, token_b: Address, fee: u32) -> Option<Address> {
        match self.registry.get_pool(token_a, token_b, fee).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("existence check failed for ({token_a:?}, {token_b:?}, {fee}): {e}");
                None
            }
        }
    }

    /// Enumerates candidate paths from `token_in` to `token_out`.
    ///
    /// The caller must reject `token_in == token_out` before invoking.
    pub async fn discover(
        &self,
        token_in: Address,
        token_out: Address,
        max_hops: usize,
    ) -> Vec<Candidate> {
        let mut candidates = self.direct_routes(token_in, token_out).await;

        if max_hops >= 2 {
            candidates.extend(self.two_hop_routes(token_in, token_out).await);
        }

        if candidates.is_empty() && max_hops >= 3 {
            candidates.extend(self.three_hop_fallback(token_in, token_out).await);
        }

        debug!(
            "discovery found {} candidate path(s) for {token_in:?} -> {token_out:?}",
            candidates.len()
        );
        candidates
    }

    async fn direct_routes(&self, token_in: Address, token_out: Address) -> Vec<Candidate> {
        let checks = self.fee_tiers.iter().map(|&fee| async move {
            (fee, self.exists(token_in, token_out, fee).await)
        });
        join_all(checks)
            .await
            .into_iter()
            .filter_map(|(fee, pool)| {
                pool.map(|pool| Candidate {
                    path: CandidatePath::single(token_in, token_out, fee),
                    pools: vec![pool],
                })
            })
            .collect()
    }

    async fn two_hop_routes(&self, token_in: Address, token_out: Address) -> Vec<Candidate> {
        let bases: Vec<Address> = self
            .base_tokens
            .iter()
            .copied()
            .filter(|&b| b != token_in && b != token_out)
            .collect();

        // Fan out every leg existence check at once, then recombine per base.
        let mut checks = Vec::with_capacity(bases.len() * self.fee_tiers.len() * 2);
        for &base in &bases {
            for &fee in &self.fee_tiers {
                for inbound in [true, false] {
                    checks.push(async move {
                        let (from, to) = if inbound {
                            (token_in, base)
                        } else {
                            (base, token_out)
                        };
                        (base, fee, inbound, self.exists(from, to, fee).await)
                    });
                }
            }
        }

        let mut legs_in: HashMap<Address, Vec<(u32, Address)>> = HashMap::new();
        let mut legs_out: HashMap<Address, Vec<(u32, Address)>> = HashMap::new();
        for (base, fee, inbound, pool) in join_all(checks).await {
            if let Some(pool) = pool {
                let legs = if inbound { &mut legs_in } else { &mut legs_out };
                legs.entry(base).or_default().push((fee, pool));
            }
        }

        let mut candidates = Vec::new();
        for &base in &bases {
            let (Some(ins), Some(outs)) = (legs_in.get(&base), legs_out.get(&base)) else {
                continue;
            };
            for &(fee_a, pool_a) in ins {
                for &(fee_b, pool_b) in outs {
                    let path = CandidatePath::MultiHop {
                        tokens: vec![token_in, base, token_out],
                        fees: vec![fee_a, fee_b],
                    };
                    candidates.push(Candidate {
                        path,
                        pools: vec![pool_a, pool_b],
                    });
                }
            }
        }
        candidates
    }

    /// Chains through two distinct bases with one fixed fee per hop. By
    /// default stops at the first fully connected chain; the exhaustive mode
    /// evaluates every base pair.
    async fn three_hop_fallback(&self, token_in: Address, token_out: Address) -> Vec<Candidate> {
        let bases: Vec<Address> = self
            .base_tokens
            .iter()
            .copied()
            .filter(|&b| b != token_in && b != token_out)
            .collect();
        let fee = self.fallback_fee;

        let mut candidates = Vec::new();
        for &first in &bases {
            for &second in &bases {
                if first == second {
                    continue;
                }
                let (leg_a, leg_b, leg_c) = tokio::join!(
                    self.exists(token_in, first, fee),
                    self.exists(first, second, fee),
                    self.exists(second, token_out, fee),
                );
                let (Some(pool_a), Some(pool_b), Some(pool_c)) = (leg_a, leg_b, leg_c) else {
                    continue;
                };
                let path = CandidatePath::MultiHop {
                    tokens: vec![token_in, first, second, token_out],
                    fees: vec![fee, fee, fee],
                };
                candidates.push(Candidate {
                    path,
                    pools: vec![pool_a, pool_b, pool_c],
                });
                if !self.exhaustive_three_hop {
                    return candidates;
                }
            }
        }
        candidates
    }
}
