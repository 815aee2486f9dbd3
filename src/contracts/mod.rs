// Contracts Module - Public ABIs Only

pub mod erc20;
pub mod i_swap_router;
pub mod i_uniswap_v3_factory;
pub mod i_uniswap_v3_pool;
pub mod quoter_v2;

// Public exports
pub use erc20::Erc20;
pub use i_swap_router::{ExactInputParams, ExactInputSingleParams, ISwapRouter};
pub use i_uniswap_v3_factory::IUniswapV3Factory;
pub use i_uniswap_v3_pool::IUniswapV3Pool;
pub use quoter_v2::QuoterV2;
