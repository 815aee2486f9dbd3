//! Uniswap V3 implementation of the chain adapter traits, generic over any
//! ethers [`Middleware`]. Transaction-sending methods require the middleware
//! stack to carry a signer.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use ethers::prelude::Middleware;
use ethers::types::{Address, Bytes, H256, TransactionReceipt, U256, U64};
use log::debug;
use std::sync::Arc;

use crate::contracts::i_swap_router;
use crate::contracts::quoter_v2::QuoteExactInputSingleParams;
use crate::contracts::{Erc20, ISwapRouter, IUniswapV3Factory, IUniswapV3Pool, QuoterV2};
use crate::settings::Contracts;
use crate::types::{PoolInfo, TokenInfo};

use super::{GasOracle, PathQuoter, PathSwap, PoolRegistry, PoolStateReader, SingleSwap,
            SwapExecutor, TokenSource};

/// Bundles the factory, quoter and router bindings behind the adapter traits.
#[derive(Clone)]
pub struct UniswapV3Adapter<M> {
    client: Arc<M>,
    factory: IUniswapV3Factory<M>,
    quoter: QuoterV2<M>,
    router: ISwapRouter<M>,
}

impl<M: Middleware + 'static> UniswapV3Adapter<M> {
    pub fn new(client: Arc<M>, contracts: &Contracts) -> Self {
        Self {
            factory: IUniswapV3Factory::new(contracts.factory, client.clone()),
            quoter: QuoterV2::new(contracts.quoter, client.clone()),
            router: ISwapRouter::new(contracts.router, client.clone()),
            client,
        }
    }

    pub fn router_address(&self) -> Address {
        self.router.address()
    }

    async fn settle(
        &self,
        pending: ethers::providers::PendingTransaction<'_, M::Provider>,
    ) -> Result<TransactionReceipt> {
        let receipt = pending
            .await
            .map_err(|e| anyhow!("transaction not mined: {e}"))?
            .ok_or_else(|| anyhow!("transaction dropped from the mempool"))?;
        if receipt.status != Some(U64::from(1)) {
            bail!("transaction {:?} reverted on-chain", receipt.transaction_hash);
        }
        Ok(receipt)
    }
}

#[async_trait]
impl<M: Middleware + 'static> PoolRegistry for UniswapV3Adapter<M> {
    async fn get_pool(
        &self,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Option<Address>> {
        let pool = self
            .factory
            .get_pool(token_a, token_b, fee)
            .call()
            .await
            .map_err(|e| anyhow!("factory getPool failed: {e}"))?;
        Ok(if pool.is_zero() { None } else { Some(pool) })
    }
}

#[async_trait]
impl<M: Middleware + 'static> PoolStateReader for UniswapV3Adapter<M> {
    async fn pool_state(&self, pool: Address) -> Result<PoolInfo> {
        let contract = IUniswapV3Pool::new(pool, self.client.clone());
        let (slot0, liquidity, token0, token1, fee) = tokio::try_join!(
            async {
                contract
                    .slot_0()
                    .call()
                    .await
                    .map_err(|e| anyhow!("slot0 failed for {pool:?}: {e}"))
            },
            async {
                contract
                    .liquidity()
                    .call()
                    .await
                    .map_err(|e| anyhow!("liquidity failed for {pool:?}: {e}"))
            },
            async {
                contract
                    .token_0()
                    .call()
                    .await
                    .map_err(|e| anyhow!("token0 failed for {pool:?}: {e}"))
            },
            async {
                contract
                    .token_1()
                    .call()
                    .await
                    .map_err(|e| anyhow!("token1 failed for {pool:?}: {e}"))
            },
            async {
                contract
                    .fee()
                    .call()
                    .await
                    .map_err(|e| anyhow!("fee failed for {pool:?}: {e}"))
            },
        )?;
        Ok(PoolInfo {
            address: pool,
            token0,
            token1,
            fee,
            liquidity,
            sqrt_price_x96: slot0.0,
        })
    }
}

#[async_trait]
impl<M: Middleware + 'static> PathQuoter for UniswapV3Adapter<M> {
    async fn quote_single(
        &self,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<(U256, U256)> {
        let params = QuoteExactInputSingleParams {
            token_in,
            token_out,
            amount_in,
            fee,
            sqrt_price_limit_x96: U256::zero(),
        };
        let (amount_out, _sqrt_after, _ticks_crossed, gas_estimate) = self
            .quoter
            .quote_exact_input_single(params)
            .call()
            .await
            .map_err(|e| anyhow!("quoteExactInputSingle reverted: {e}"))?;
        Ok((amount_out, gas_estimate))
    }

    async fn quote_path(&self, path: Bytes, amount_in: U256) -> Result<(U256, U256)> {
        let (amount_out, _sqrt_afters, _ticks_crossed, gas_estimate) = self
            .quoter
            .quote_exact_input(path, amount_in)
            .call()
            .await
            .map_err(|e| anyhow!("quoteExactInput reverted: {e}"))?;
        Ok((amount_out, gas_estimate))
    }
}

#[async_trait]
impl<M: Middleware + 'static> SwapExecutor for UniswapV3Adapter<M> {
    fn owner(&self) -> Address {
        self.client.default_sender().unwrap_or_default()
    }

    fn spender(&self) -> Address {
        self.router.address()
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Erc20::new(token, self.client.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| anyhow!("allowance read failed for {token:?}: {e}"))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<H256> {
        let call = Erc20::new(token, self.client.clone()).approve(spender, amount);
        let pending = call
            .send()
            .await
            .map_err(|e| anyhow!("approval rejected: {e}"))?;
        let receipt = self.settle(pending).await?;
        debug!("approve mined: {:?}", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }

    async fn swap_single(&self, swap: SingleSwap) -> Result<H256> {
        let params = i_swap_router::ExactInputSingleParams {
            token_in: swap.token_in,
            token_out: swap.token_out,
            fee: swap.fee,
            recipient: swap.recipient,
            deadline: swap.deadline,
            amount_in: swap.amount_in,
            amount_out_minimum: swap.amount_out_minimum,
            sqrt_price_limit_x96: U256::zero(),
        };
        let call = self.router.exact_input_single(params);
        let pending = call.send().await.map_err(|e| anyhow!("swap rejected: {e}"))?;
        let receipt = self.settle(pending).await?;
        Ok(receipt.transaction_hash)
    }

    async fn swap_path(&self, swap: PathSwap) -> Result<H256> {
        let params = i_swap_router::ExactInputParams {
            path: swap.path,
            recipient: swap.recipient,
            deadline: swap.deadline,
            amount_in: swap.amount_in,
            amount_out_minimum: swap.amount_out_minimum,
        };
        let call = self.router.exact_input(params);
        let pending = call.send().await.map_err(|e| anyhow!("swap rejected: {e}"))?;
        let receipt = self.settle(pending).await?;
        Ok(receipt.transaction_hash)
    }
}

#[async_trait]
impl<M: Middleware + 'static> TokenSource for UniswapV3Adapter<M> {
    async fn fetch_metadata(&self, token: Address) -> Result<TokenInfo> {
        let contract = Erc20::new(token, self.client.clone());
        let (symbol, decimals, name) = tokio::try_join!(
            async {
                contract
                    .symbol()
                    .call()
                    .await
                    .map_err(|e| anyhow!("symbol read failed for {token:?}: {e}"))
            },
            async {
                contract
                    .decimals()
                    .call()
                    .await
                    .map_err(|e| anyhow!("decimals read failed for {token:?}: {e}"))
            },
            async { Ok(contract.name().call().await.ok()) },
        )?;
        Ok(TokenInfo {
            address: token,
            symbol,
            decimals,
            name,
        })
    }
}

#[async_trait]
impl<M: Middleware + 'static> GasOracle for UniswapV3Adapter<M> {
    async fn gas_price(&self) -> Result<U256> {
        self.client
            .get_gas_price()
            .await
            .map_err(|e| anyhow!("gas price read failed: {e}"))
    }
}
