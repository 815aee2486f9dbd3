//! # Token Metadata Resolver
//!
//! Process-wide read-through cache for ERC-20 metadata. Well-known tokens are
//! pre-seeded so routing stays functional even when the RPC endpoint is
//! degraded; everything else is fetched on first use and cached for the
//! configured TTL. Concurrent resolutions of the same address are coalesced
//! behind a per-address lock so one miss triggers one network fetch.

use dashmap::DashMap;
use ethers::types::Address;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;

use crate::adapters::TokenSource;
use crate::error::EngineError;
use crate::metrics;
use crate::types::TokenInfo;

#[derive(Debug, Clone)]
struct CacheEntry {
    info: TokenInfo,
    inserted_at: Instant,
    /// Seeded entries never expire.
    pinned: bool,
}

pub struct TokenResolver {
    source: Arc<dyn TokenSource>,
    cache: DashMap<Address, CacheEntry>,
    inflight: DashMap<Address, Arc<Mutex<()>>>,
    ttl: Option<Duration>,
}

impl TokenResolver {
    pub fn new(source: Arc<dyn TokenSource>, ttl: Option<Duration>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            inflight: DashMap::new(),
            ttl,
        }
    }

    /// Resolver pre-seeded with Ethereum mainnet natives and majors.
    pub fn with_mainnet_seeds(source: Arc<dyn TokenSource>, ttl: Option<Duration>) -> Self {
        let resolver = Self::new(source, ttl);
        resolver.seed(mainnet_seed_tokens());
        resolver
    }

    /// Pins the given tokens into the cache; pinned entries never expire.
    pub fn seed(&self, tokens: Vec<TokenInfo>) {
        for info in tokens {
            self.cache.insert(
                info.address,
                CacheEntry {
                    info,
                    inserted_at: Instant::now(),
                    pinned: true,
                },
            );
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn fresh(&self, entry: &CacheEntry) -> bool {
        if entry.pinned {
            return true;
        }
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() < ttl,
            None => true,
        }
    }

    /// Resolves metadata for `address`, hitting the network only on a miss or
    /// an expired entry. A stale entry is returned as fallback when the
    /// refresh fails.
    pub async fn resolve(&self, address: Address) -> Result<TokenInfo, EngineError> {
        if let Some(entry) = self.cache.get(&address) {
            if self.fresh(&entry) {
                metrics::increment_cache_hit("token_metadata");
                return Ok(entry.info.clone());
            }
        }
        metrics::increment_cache_miss("token_metadata");

        // One in-flight resolution per address; latecomers wait and then
        // re-read the cache instead of issuing duplicate fetches.
        let lock = self
            .inflight
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(entry) = self.cache.get(&address) {
            if self.fresh(&entry) {
                self.inflight.remove(&address);
                return Ok(entry.info.clone());
            }
        }

        let strategy = ExponentialBackoff::from_millis(50).take(2);
        let result = Retry::spawn(strategy, || self.source.fetch_metadata(address)).await;
        self.inflight.remove(&address);

        match result {
            Ok(info) => {
                debug!("resolved token {:?} as {}", address, info.symbol);
                self.cache.insert(
                    address,
                    CacheEntry {
                        info: info.clone(),
                        inserted_at: Instant::now(),
                        pinned: false,
                    },
                );
                Ok(info)
            }
            Err(e) => {
                if let Some(entry) = self.cache.get(&address) {
                    warn!(
                        "metadata refresh failed for {:?}, serving stale entry: {e}",
                        address
                    );
                    return Ok(entry.info.clone());
                }
                Err(EngineError::Resolution(address, e.to_string()))
            }
        }
    }
}

static MAINNET_SEEDS: Lazy<Vec<TokenInfo>> = Lazy::new(|| {
    [
        ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "WETH", 18u8),
        ("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", 6),
        ("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", 6),
        ("0x6B175474E89094C44Da98b954EedeAC495271d0F", "DAI", 18),
    ]
    .iter()
    .map(|(addr, symbol, decimals)| {
        TokenInfo::new(Address::from_str(addr).unwrap(), *symbol, *decimals)
    })
    .collect()
});

/// WETH, USDC, USDT and DAI on Ethereum mainnet.
pub fn mainnet_seed_tokens() -> Vec<TokenInfo> {
    MAINNET_SEEDS.clone()
}
