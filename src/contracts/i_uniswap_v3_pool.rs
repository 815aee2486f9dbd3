use ethers::prelude::*;

// Exact Solidity widths matter here: uint160 for sqrtPriceX96, int24 for
// tick, uint24 for fee, uint128 for liquidity. Any deviation causes silent
// decoding errors.
abigen!(
    IUniswapV3Pool,
    r#"[
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
        function liquidity() external view returns (uint128)
        function token0() external view returns (address)
        function token1() external view returns (address)
        function fee() external view returns (uint24)
    ]"#
);
