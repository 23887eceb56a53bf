//! ERC20 token interface
//! Typed bindings for metadata reads plus the raw ABI used to encode probe legs
use ethers::abi::parse_abi;
use ethers::contract::BaseContract;
use ethers::prelude::*;
use once_cell::sync::Lazy;

abigen!(
    IERC20,
    r#"[
        function name() external view returns (string)
        function symbol() external view returns (string)
    ]"#,
);

/// Calls issued against the token during a probe
pub static ERC20_ABI: Lazy<BaseContract> = Lazy::new(|| {
    BaseContract::from(
        parse_abi(&[
            "function balanceOf(address account) external view returns (uint256)",
            "function transfer(address to, uint256 amount) external returns (bool)",
            "function approve(address spender, uint256 amount) external returns (bool)",
        ])
        .expect("static ERC20 ABI is valid"),
    )
});
