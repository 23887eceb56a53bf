use ethers::types::{Address, Bytes, U256};
use crate::models::{ProbeContext, Verdict};
use crate::utils::Result;

/// Amounts actually consumed by a liquidity deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityReceipt {
    pub token_amount: U256,
    pub native_amount: U256,
    pub liquidity: U256,
}

/// Boundary to an external AMM router and the ledger behind it
///
/// Swap methods report the balance delta measured on the ledger, never the
/// amounts the router or token claim. Exchange and token rejections surface
/// as `ScreenerError::Router`; anything else is an infrastructure failure.
pub trait RouterAdapter {
    /// Credit native currency to an account (state override)
    fn allocate_native(&mut self, account: Address, amount: U256) -> Result<()>;

    /// Install code at an account so it acts as a contract (state override)
    fn install_code(&mut self, account: Address, code: Bytes) -> Result<()>;

    fn native_balance(&mut self, account: Address) -> Result<U256>;

    fn token_balance(&mut self, token: Address, holder: Address) -> Result<U256>;

    /// Swap `native_in` for `token`, delivered to `account`
    fn buy_with_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        native_in: U256,
    ) -> Result<U256>;

    /// Swap `token_in` of `account`'s tokens back to native currency
    fn sell_for_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        token_in: U256,
    ) -> Result<U256>;

    #[allow(clippy::too_many_arguments)]
    fn add_liquidity(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        token_amount: U256,
        native_amount: U256,
        recipient: Address,
        deadline: U256,
    ) -> Result<LiquidityReceipt>;

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256) -> Result<()>;
}

/// Core abstraction: one screening policy driven through a router
pub trait Evaluator: Send + Sync {
    /// Unique identifier for this evaluator
    fn name(&self) -> &'static str;

    /// Run the probe and reach a verdict.
    /// An `Err` means the probe could not complete and is never a `Fail`.
    fn evaluate(&self, ledger: &mut dyn RouterAdapter, ctx: &mut ProbeContext) -> Result<Verdict>;
}
