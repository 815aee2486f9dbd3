//! # Chain Adapter Traits
//!
//! The engine's external boundary: factory lookups, pool state reads, quote
//! simulations and swap execution are abstracted behind async traits so the
//! routing core never touches a concrete RPC client. The Uniswap V3
//! implementation lives in [`uniswap_v3`]; tests substitute in-memory mocks.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

use crate::types::{PoolInfo, TokenInfo};

pub mod uniswap_v3;

pub use uniswap_v3::UniswapV3Adapter;

/// Factory-style pool registry. Absence of a pool for an exact
/// (pair, fee) combination is an expected outcome, not an error, and the
/// lookup is order-independent in the token pair.
#[async_trait]
pub trait PoolRegistry: Send + Sync {
    async fn get_pool(&self, token_a: Address, token_b: Address, fee: u32)
        -> Result<Option<Address>>;
}

/// Reads a pool's current liquidity, price and constituent tokens.
#[async_trait]
pub trait PoolStateReader: Send + Sync {
    async fn pool_state(&self, pool: Address) -> Result<PoolInfo>;
}

/// Quote simulation against the external quoter. Both calls return
/// `(amount_out, gas_estimate)`; a revert for a given path is reported as an
/// error and absorbed by the quoting layer.
#[async_trait]
pub trait PathQuoter: Send + Sync {
    async fn quote_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<(U256, U256)>;

    /// `path` is the packed token/fee encoding produced by
    /// [`CandidatePath::encode`](crate::types::CandidatePath::encode).
    async fn quote_path(&self, path: Bytes, amount_in: U256) -> Result<(U256, U256)>;
}

/// Parameters for a single-pool swap.
#[derive(Debug, Clone)]
pub struct SingleSwap {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

/// Parameters for a multi-hop swap over a packed path.
#[derive(Debug, Clone)]
pub struct PathSwap {
    pub path: Bytes,
    pub recipient: Address,
    pub deadline: U256,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

/// Transaction surface for the approval-then-swap workflow. Every method
/// waits for a mined receipt; a reverted receipt is an error, and the
/// returned hash is the mined transaction.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    /// Address whose funds are spent (the connected signer).
    fn owner(&self) -> Address;

    /// Address approvals are granted to (the router).
    fn spender(&self) -> Address;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<H256>;

    async fn swap_single(&self, swap: SingleSwap) -> Result<H256>;

    async fn swap_path(&self, swap: PathSwap) -> Result<H256>;
}

/// On-chain token metadata reads backing the resolver cache.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_metadata(&self, token: Address) -> Result<TokenInfo>;
}

/// Current gas price used to express gas estimates in output-token terms.
#[async_trait]
pub trait GasOracle: Send + Sync {
    async fn gas_price(&self) -> Result<U256>;
}
