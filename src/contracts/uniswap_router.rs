//! UniswapV2Router02 interface
//! Only the entry points the probe legs and liquidity listing need
use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use once_cell::sync::Lazy;

pub static ROUTER_ABI: Lazy<BaseContract> = Lazy::new(|| {
    BaseContract::from(
        parse_abi(&[
            "function WETH() external pure returns (address)",
            "function addLiquidityETH(address token, uint amountTokenDesired, uint amountTokenMin, uint amountETHMin, address to, uint deadline) external payable returns (uint amountToken, uint amountETH, uint liquidity)",
            "function swapExactETHForTokensSupportingFeeOnTransferTokens(uint amountOutMin, address[] calldata path, address to, uint deadline) external payable",
            "function swapExactTokensForETHSupportingFeeOnTransferTokens(uint amountIn, uint amountOutMin, address[] calldata path, address to, uint deadline) external",
        ])
        .expect("static router ABI is valid"),
    )
});
