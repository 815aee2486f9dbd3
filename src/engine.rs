//! # Route Engine
//!
//! One quoting cycle end to end: discovery over the registry, concurrent
//! quoting of every candidate, gas-aware ranking, and token-metadata
//! resolution for the caller-facing routes. The engine is stateless across
//! cycles; the [`SwapSession`](crate::session::SwapSession) owns lifecycle
//! and freshness.

use ethers::types::{Address, U256};
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::{GasOracle, PathQuoter, PoolRegistry, PoolStateReader};
use crate::discovery::RouteDiscovery;
use crate::error::EngineError;
use crate::metrics;
use crate::quoting::RouteQuoter;
use crate::ranking::{self, GasCosting, RankedQuote};
use crate::settings::Settings;
use crate::token_resolver::TokenResolver;
use crate::types::{format_token_amount, Candidate, Route, SwapRequest};
use crate::v3_math;

pub struct RouteEngine {
    discovery: RouteDiscovery,
    quoter: RouteQuoter,
    registry: Arc<dyn PoolRegistry>,
    state: Arc<dyn PoolStateReader>,
    gas: Arc<dyn GasOracle>,
    resolver: Arc<TokenResolver>,
    weth: Address,
    fee_tiers: Vec<u32>,
    max_hops: usize,
}

impl RouteEngine {
    pub fn new(
        registry: Arc<dyn PoolRegistry>,
        state: Arc<dyn PoolStateReader>,
        quoter: Arc<dyn PathQuoter>,
        gas: Arc<dyn GasOracle>,
        resolver: Arc<TokenResolver>,
        settings: &Settings,
    ) -> Self {
        Self {
            discovery: RouteDiscovery::new(registry.clone(), &settings.routing),
            quoter: RouteQuoter::new(quoter, state.clone()),
            registry,
            state,
            gas,
            resolver,
            weth: settings.tokens.weth,
            fee_tiers: settings.routing.fee_tiers.clone(),
            max_hops: settings.routing.max_hops,
        }
    }

    /// Candidate enumeration for a validated request. An empty result is the
    /// session-level "No routes found" condition.
    pub async fn discover(&self, request: &SwapRequest) -> Result<Vec<Candidate>, EngineError> {
        request.validate()?;
        let candidates = self
            .discovery
            .discover(request.token_in, request.token_out, self.max_hops)
            .await;
        if candidates.is_empty() {
            return Err(EngineError::NoRoute);
        }
        Ok(candidates)
    }

    /// Quotes and ranks previously discovered candidates into caller-facing
    /// routes, best first.
    pub async fn quote_and_rank(
        &self,
        request: &SwapRequest,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<Route>, EngineError> {
        let started = Instant::now();
        let quotes = self.quoter.quote_all(&candidates, request.amount_in).await;
        let costing = self.gas_costing(request.token_out).await;
        let ranked = ranking::rank(quotes, &costing)?;

        let mut routes = Vec::with_capacity(ranked.len());
        for entry in ranked {
            routes.push(self.build_route(entry).await?);
        }

        metrics::record_quote_cycle_duration(started.elapsed());
        metrics::set_routes_found(routes.len() as f64);
        info!(
            "quote cycle finished: {} route(s), best output {}",
            routes.len(),
            routes[0].formatted_out
        );
        Ok(routes)
    }

    /// Full cycle: discovery, quoting, ranking.
    pub async fn find_routes(&self, request: &SwapRequest) -> Result<Vec<Route>, EngineError> {
        let candidates = self.discover(request).await?;
        self.quote_and_rank(request, candidates).await
    }

    /// Prices one wei of the native asset in output-token raw units so the
    /// gas estimate can be subtracted in matching units. Identity when the
    /// output is the wrapped native token; otherwise derived from the
    /// deepest-tier WETH pool's spot price. Absent any conversion path the
    /// gas term is skipped for the cycle.
    async fn gas_costing(&self, token_out: Address) -> GasCosting {
        let gas_price_wei = match self.gas.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!("gas price unavailable, skipping gas-aware ranking: {e}");
                return GasCosting::disabled();
            }
        };

        if token_out == self.weth {
            return GasCosting {
                gas_price_wei,
                native_to_output_rate: Some(1.0),
            };
        }

        for &fee in &self.fee_tiers {
            let pool = match self.registry.get_pool(self.weth, token_out, fee).await {
                Ok(Some(pool)) => pool,
                Ok(None) => continue,
                Err(e) => {
                    debug!("gas-rate pool lookup failed at fee {fee}: {e}");
                    continue;
                }
            };
            match self.state.pool_state(pool).await {
                Ok(state) => {
                    let rate =
                        v3_math::hop_spot_rate(state.token0, self.weth, state.sqrt_price_x96);
                    if rate > 0.0 && rate.is_finite() {
                        return GasCosting {
                            gas_price_wei,
                            native_to_output_rate: Some(rate),
                        };
                    }
                }
                Err(e) => debug!("gas-rate state read failed for {pool:?}: {e}"),
            }
        }

        GasCosting {
            gas_price_wei,
            native_to_output_rate: None,
        }
    }

    async fn build_route(&self, entry: RankedQuote) -> Result<Route, EngineError> {
        let tokens = entry.quote.path.tokens();
        let infos = join_all(tokens.iter().map(|&t| self.resolver.resolve(t))).await;
        let mut path = Vec::with_capacity(infos.len());
        for info in infos {
            path.push(info?);
        }

        let out_decimals = path.last().map(|t| t.decimals).unwrap_or(18);
        let formatted_out = format_token_amount(entry.quote.amount_out, out_decimals);
        Ok(Route {
            fees: entry.quote.path.fees(),
            pools: entry.quote.pools.clone(),
            candidate: entry.quote.path.clone(),
            amount_out: entry.quote.amount_out,
            formatted_out,
            price_impact_pct: entry.quote.price_impact_pct,
            gas_estimate: entry.quote.gas_estimate,
            gas_cost_in_output: entry.gas_cost_in_output,
            path,
        })
    }
}

/// Invariant check used by debug assertions and tests: every surfaced route
/// carries one fee per hop and a positive output.
pub fn route_is_well_formed(route: &Route) -> bool {
    route.fees.len() == route.path.len() - 1 && route.amount_out > U256::zero()
}
