// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use alloy::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniswapV2Factory {
        function allPairsLength() external view returns (uint256 length);
        function allPairs(uint256 index) external view returns (address pair);
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniswapV2Pair {
        function token0() external view returns (address token);
        function token1() external view returns (address token);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract UniswapV2Router {
        function factory() external view returns (address factory);
        function getAmountsOut(uint256 amountIn, address[] memory path) external view returns (uint256[] memory amounts);
    }

    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    contract ArbExecutor {
        struct SwapAction {
            address router;
            address[] path;
            uint256 amountIn;
            uint256 minOut;
        }

        struct TradePlan {
            address loanToken;
            uint256 loanAmount;
            SwapAction[] steps;
            uint256 minProfit;
            address beneficiary;
        }

        function executeArb(TradePlan calldata plan) external;
    }
}
