//! In-memory chain doubles shared by the integration suites.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use swap_router_sdk::adapters::{
    GasOracle, PathQuoter, PathSwap, PoolRegistry, PoolStateReader, SingleSwap, SwapExecutor,
    TokenSource,
};
use swap_router_sdk::engine::RouteEngine;
use swap_router_sdk::settings::{Routing, Settings};
use swap_router_sdk::token_resolver::TokenResolver;
use swap_router_sdk::types::{PoolInfo, TokenInfo};
use swap_router_sdk::v3_math::Q96;

pub fn addr(byte: u8) -> Address {
    Address::from([byte; 20])
}

fn pair_key(a: Address, b: Address, fee: u32) -> (Address, Address, u32) {
    if a < b {
        (a, b, fee)
    } else {
        (b, a, fee)
    }
}

/// One fake pool: registry entry, state snapshot and quoting behavior.
#[derive(Clone)]
pub struct FakePool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
}

/// A deterministic in-memory chain: pools, quote outcomes, gas price and
/// token metadata, all behind the adapter traits.
pub struct FakeChain {
    pools: HashMap<(Address, Address, u32), FakePool>,
    /// Quote per encoded path key; missing entry means the simulation reverts.
    quotes: DashMap<String, (U256, U256)>,
    pub quote_calls: AtomicUsize,
    pub gas_price_wei: U256,
    /// When set, every quote consumes one permit before returning, letting a
    /// test hold a cycle open and release it deterministically.
    pub quote_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            pools: HashMap::new(),
            quotes: DashMap::new(),
            quote_calls: AtomicUsize::new(0),
            gas_price_wei: U256::one(),
            quote_gate: Mutex::new(None),
        }
    }

    pub fn with_pool(mut self, token_a: Address, token_b: Address, fee: u32, pool: Address) -> Self {
        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        self.pools.insert(
            pair_key(token_a, token_b, fee),
            FakePool {
                address: pool,
                token0,
                token1,
                fee,
            },
        );
        self
    }

    fn quote_key(tokens: &[Address], fees: &[u32]) -> String {
        let mut key = String::new();
        for (i, token) in tokens.iter().enumerate() {
            key.push_str(&format!("{token:?}"));
            if let Some(fee) = fees.get(i) {
                key.push_str(&format!("|{fee}|"));
            }
        }
        key
    }

    /// Registers a successful quote for the exact token/fee sequence.
    pub fn with_quote(
        self,
        tokens: &[Address],
        fees: &[u32],
        amount_out: u64,
        gas_estimate: u64,
    ) -> Self {
        self.quotes.insert(
            Self::quote_key(tokens, fees),
            (U256::from(amount_out), U256::from(gas_estimate)),
        );
        self
    }

    pub fn gate_quotes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.quote_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Clears the gate and releases everything still waiting on it.
    pub fn open_quotes(&self) {
        if let Some(gate) = self.quote_gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    async fn maybe_wait(&self) {
        let gate = self.quote_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let permit = gate.acquire().await.unwrap();
            permit.forget();
        }
    }

    fn decode_path(path: &Bytes) -> (Vec<Address>, Vec<u32>) {
        let bytes = path.as_ref();
        let mut tokens = Vec::new();
        let mut fees = Vec::new();
        let mut offset = 0;
        while offset + 20 <= bytes.len() {
            tokens.push(Address::from_slice(&bytes[offset..offset + 20]));
            offset += 20;
            if offset + 3 <= bytes.len() {
                let fee = u32::from_be_bytes([0, bytes[offset], bytes[offset + 1], bytes[offset + 2]]);
                fees.push(fee);
                offset += 3;
            }
        }
        (tokens, fees)
    }
}

#[async_trait]
impl PoolRegistry for FakeChain {
    async fn get_pool(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Option<Address>> {
        Ok(self
            .pools
            .get(&pair_key(token_a, token_b, fee))
            .map(|p| p.address))
    }
}

#[async_trait]
impl PoolStateReader for FakeChain {
    async fn pool_state(&self, pool: Address) -> Result<PoolInfo> {
        for entry in self.pools.values() {
            if entry.address == pool {
                return Ok(PoolInfo {
                    address: pool,
                    token0: entry.token0,
                    token1: entry.token1,
                    fee: entry.fee,
                    liquidity: 1_000_000_000,
                    sqrt_price_x96: Q96,
                });
            }
        }
        bail!("unknown pool {pool:?}")
    }
}

#[async_trait]
impl PathQuoter for FakeChain {
    async fn quote_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee: u32,
        _amount_in: U256,
    ) -> Result<(U256, U256)> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_wait().await;
        match self
            .quotes
            .get(&Self::quote_key(&[token_in, token_out], &[fee]))
        {
            Some(entry) => Ok(*entry.value()),
            None => bail!("execution reverted"),
        }
    }

    async fn quote_path(&self, path: Bytes, _amount_in: U256) -> Result<(U256, U256)> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_wait().await;
        let (tokens, fees) = Self::decode_path(&path);
        match self.quotes.get(&Self::quote_key(&tokens, &fees)) {
            Some(entry) => Ok(*entry.value()),
            None => bail!("execution reverted"),
        }
    }
}

#[async_trait]
impl GasOracle for FakeChain {
    async fn gas_price(&self) -> Result<U256> {
        Ok(self.gas_price_wei)
    }
}

#[async_trait]
impl TokenSource for FakeChain {
    async fn fetch_metadata(&self, token: Address) -> Result<TokenInfo> {
        Ok(TokenInfo::new(
            token,
            format!("T{:02X}", token.as_bytes()[0]),
            18,
        ))
    }
}

/// Records approvals and swaps; configurable allowance and failure modes.
pub struct RecordingExecutor {
    pub owner: Address,
    pub spender: Address,
    pub allowance: AtomicU64,
    pub fail_approval: bool,
    pub fail_swap: bool,
    pub approvals: Mutex<Vec<(Address, U256)>>,
    pub single_swaps: Mutex<Vec<SingleSwap>>,
    pub path_swaps: Mutex<Vec<PathSwap>>,
}

impl RecordingExecutor {
    pub fn new(allowance: u64) -> Self {
        Self {
            owner: addr(0xEE),
            spender: addr(0xDD),
            allowance: AtomicU64::new(allowance),
            fail_approval: false,
            fail_swap: false,
            approvals: Mutex::new(Vec::new()),
            single_swaps: Mutex::new(Vec::new()),
            path_swaps: Mutex::new(Vec::new()),
        }
    }

    pub fn approval_count(&self) -> usize {
        self.approvals.lock().unwrap().len()
    }
}

#[async_trait]
impl SwapExecutor for RecordingExecutor {
    fn owner(&self) -> Address {
        self.owner
    }

    fn spender(&self) -> Address {
        self.spender
    }

    async fn allowance(&self, _token: Address, _owner: Address, _spender: Address) -> Result<U256> {
        Ok(U256::from(self.allowance.load(Ordering::SeqCst)))
    }

    async fn approve(&self, token: Address, _spender: Address, amount: U256) -> Result<H256> {
        if self.fail_approval {
            bail!("user rejected transaction");
        }
        self.approvals.lock().unwrap().push((token, amount));
        self.allowance.store(amount.as_u64(), Ordering::SeqCst);
        Ok(H256::from_low_u64_be(0xA11))
    }

    async fn swap_single(&self, swap: SingleSwap) -> Result<H256> {
        if self.fail_swap {
            bail!("execution reverted: Too little received");
        }
        self.single_swaps.lock().unwrap().push(swap);
        Ok(H256::from_low_u64_be(0x5A1))
    }

    async fn swap_path(&self, swap: PathSwap) -> Result<H256> {
        if self.fail_swap {
            bail!("execution reverted: Too little received");
        }
        self.path_swaps.lock().unwrap().push(swap);
        Ok(H256::from_low_u64_be(0x5A2))
    }
}

/// Settings tuned for tests: two fee tiers, caller-chosen bases, no WETH
/// special case unless the test opts in.
pub fn test_settings(base_tokens: Vec<Address>) -> Settings {
    let mut settings = Settings::default();
    settings.routing = Routing {
        fee_tiers: vec![500, 3000],
        base_tokens,
        max_hops: 3,
        fallback_fee: 3000,
        exhaustive_three_hop: false,
    };
    // Point WETH at an address no test uses so gas ranking stays inert
    // unless a suite wires it up on purpose.
    settings.tokens.weth = addr(0xFE);
    settings
}

pub fn engine_for(chain: Arc<FakeChain>, settings: &Settings) -> Arc<RouteEngine> {
    let resolver = Arc::new(TokenResolver::new(chain.clone(), None));
    Arc::new(RouteEngine::new(
        chain.clone(),
        chain.clone(),
        chain.clone(),
        chain,
        resolver,
        settings,
    ))
}
