//! In-memory constant-product exchange
//!
//! A UniswapV2-style router with one native pool per token and the 0.3% swap
//! fee. Token contracts are modelled by `SandboxToken`, so their transfer
//! rules run inside swaps exactly where a real pair would invoke them.
use std::collections::{HashMap, HashSet};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::keccak256;
use crate::core::{LiquidityReceipt, RouterAdapter};
use crate::sandbox::token::{SandboxToken, TokenBehavior, TransferScope};
use crate::utils::{Result, RouterError, ScreenerError};

/// Liquidity burned on the first deposit of every pool
pub const MINIMUM_LIQUIDITY: u64 = 1_000;

#[derive(Debug, Clone, Default)]
struct Pool {
    token_reserve: U256,
    native_reserve: U256,
    total_supply: U256,
    shares: HashMap<Address, U256>,
}

#[derive(Debug, Clone)]
pub struct SandboxExchange {
    router: Address,
    timestamp: u64,
    native: HashMap<Address, U256>,
    code: HashSet<Address>,
    tokens: HashMap<Address, SandboxToken>,
    pools: HashMap<Address, Pool>,
}

impl SandboxExchange {
    pub const DEADLINE_BUFFER: u64 = 180;

    pub fn new(router: Address) -> Self {
        Self {
            router,
            timestamp: 1_700_000_000,
            native: HashMap::new(),
            code: HashSet::new(),
            tokens: HashMap::new(),
            pools: HashMap::new(),
        }
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Current timestamp plus the usual listing buffer
    pub fn deadline(&self) -> U256 {
        U256::from(self.timestamp + Self::DEADLINE_BUFFER)
    }

    /// Pair address the router uses for `token`'s native pool
    pub fn pair_address(&self, token: Address) -> Address {
        let mut preimage = self.router.as_bytes().to_vec();
        preimage.extend_from_slice(token.as_bytes());
        Address::from_slice(&keccak256(preimage)[12..])
    }

    /// Deploy a token with its whole supply held by `owner`
    pub fn deploy_token(
        &mut self,
        token: Address,
        owner: Address,
        supply: U256,
        behavior: TokenBehavior,
    ) -> Result<()> {
        if self.tokens.contains_key(&token) {
            return Err(ScreenerError::SimulationError(format!("token {:?} already deployed", token)));
        }
        behavior.validate()?;
        tracing::debug!("Deploying {:?} token at {:?}", behavior, token);
        self.tokens.insert(token, SandboxToken::new(owner, supply, behavior));
        Ok(())
    }

    /// `(token_reserve, native_reserve)` of the token's pool
    pub fn pool_reserves(&self, token: Address) -> Option<(U256, U256)> {
        self.pools
            .get(&token)
            .map(|pool| (pool.token_reserve, pool.native_reserve))
    }

    pub fn liquidity_of(&self, token: Address, holder: Address) -> U256 {
        self.pools
            .get(&token)
            .and_then(|pool| pool.shares.get(&holder).copied())
            .unwrap_or_default()
    }

    pub fn has_code(&self, account: Address) -> bool {
        self.code.contains(&account)
    }

    fn check_router(&self, router: Address) -> Result<()> {
        if router != self.router {
            return Err(RouterError::new(format!("no router deployed at {:?}", router)).into());
        }
        Ok(())
    }

    fn token(&self, token: Address) -> Result<&SandboxToken> {
        self.tokens
            .get(&token)
            .ok_or_else(|| RouterError::new(format!("no token deployed at {:?}", token)).into())
    }

    fn token_mut(&mut self, token: Address) -> Result<&mut SandboxToken> {
        self.tokens
            .get_mut(&token)
            .ok_or_else(|| RouterError::new(format!("no token deployed at {:?}", token)).into())
    }

    fn native_of(&self, account: Address) -> U256 {
        self.native.get(&account).copied().unwrap_or_default()
    }

    fn debit_native(&mut self, account: Address, amount: U256) -> Result<()> {
        let balance = self.native_of(account);
        if balance < amount {
            return Err(RouterError::new("insufficient native balance").into());
        }
        self.native.insert(account, balance - amount);
        Ok(())
    }

    fn credit_native(&mut self, account: Address, amount: U256) -> Result<()> {
        let entry = self.native.entry(account).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(ScreenerError::Overflow("native balance"))?;
        Ok(())
    }

    /// Token transfer as the token contract would see it
    fn move_tokens(&mut self, token: Address, from: Address, to: Address, amount: U256) -> Result<U256> {
        let scope = TransferScope {
            pair: self.pair_address(token),
            sender_has_code: self.has_code(from),
        };
        self.token_mut(token)?.transfer(from, to, amount, scope)
    }

    fn pool(&self, token: Address) -> Result<&Pool> {
        self.pools
            .get(&token)
            .filter(|pool| !pool.token_reserve.is_zero() && !pool.native_reserve.is_zero())
            .ok_or_else(|| RouterError::new("UniswapV2Library: INSUFFICIENT_LIQUIDITY").into())
    }

    fn ensure_live(&self, deadline: U256) -> Result<()> {
        if deadline < U256::from(self.timestamp) {
            return Err(RouterError::new("UniswapV2Router: EXPIRED").into());
        }
        Ok(())
    }
}

/// UniswapV2 `getAmountOut` with the 0.3% fee
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    if amount_in.is_zero() {
        return Err(RouterError::new("UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT").into());
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(RouterError::new("UniswapV2Library: INSUFFICIENT_LIQUIDITY").into());
    }
    let overflow = || ScreenerError::Overflow("swap output");

    let amount_in_with_fee = amount_in.checked_mul(U256::from(997)).ok_or_else(overflow)?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out).ok_or_else(overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(1000))
        .and_then(|r| r.checked_add(amount_in_with_fee))
        .ok_or_else(overflow)?;

    Ok(numerator / denominator)
}

impl RouterAdapter for SandboxExchange {
    fn allocate_native(&mut self, account: Address, amount: U256) -> Result<()> {
        self.credit_native(account, amount)
    }

    fn install_code(&mut self, account: Address, code: Bytes) -> Result<()> {
        if code.is_empty() {
            self.code.remove(&account);
        } else {
            self.code.insert(account);
        }
        Ok(())
    }

    fn native_balance(&mut self, account: Address) -> Result<U256> {
        Ok(self.native_of(account))
    }

    fn token_balance(&mut self, token: Address, holder: Address) -> Result<U256> {
        Ok(self.token(token)?.balance_of(holder))
    }

    fn buy_with_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        native_in: U256,
    ) -> Result<U256> {
        self.check_router(router)?;
        if self.native_of(account) < native_in {
            return Err(RouterError::new("insufficient native balance").into());
        }
        let pool = self.pool(token)?;
        let amount_out = get_amount_out(native_in, pool.native_reserve, pool.token_reserve)?;
        if amount_out.is_zero() {
            return Err(RouterError::new("UniswapV2: INSUFFICIENT_OUTPUT_AMOUNT").into());
        }

        let pair = self.pair_address(token);
        let before = self.token(token)?.balance_of(account);
        self.move_tokens(token, pair, account, amount_out)?;
        self.debit_native(account, native_in)?;

        let pair_balance = self.token(token)?.balance_of(pair);
        if let Some(pool) = self.pools.get_mut(&token) {
            pool.token_reserve = pair_balance;
            pool.native_reserve = pool
                .native_reserve
                .checked_add(native_in)
                .ok_or(ScreenerError::Overflow("native reserve"))?;
        }

        let bought = self.token(token)?.balance_of(account).saturating_sub(before);
        tracing::trace!("Sandbox buy: {} native -> {} tokens", native_in, bought);
        Ok(bought)
    }

    fn sell_for_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        token_in: U256,
    ) -> Result<U256> {
        self.check_router(router)?;
        let (token_reserve, native_reserve) = {
            let pool = self.pool(token)?;
            (pool.token_reserve, pool.native_reserve)
        };

        // Price what the pair actually received, as the supporting-fee path does
        let pair = self.pair_address(token);
        let mut staged = self.clone();
        staged.move_tokens(token, account, pair, token_in)?;
        let pair_balance = staged.token(token)?.balance_of(pair);
        let received = pair_balance.saturating_sub(token_reserve);
        let amount_out = get_amount_out(received, token_reserve, native_reserve)?;

        let before = staged.native_of(account);
        staged.credit_native(account, amount_out)?;
        if let Some(pool) = staged.pools.get_mut(&token) {
            pool.token_reserve = pair_balance;
            pool.native_reserve = native_reserve - amount_out;
        }

        *self = staged;
        let recovered = self.native_of(account).saturating_sub(before);
        tracing::trace!("Sandbox sell: {} tokens -> {} native", token_in, recovered);
        Ok(recovered)
    }

    fn add_liquidity(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        token_amount: U256,
        native_amount: U256,
        recipient: Address,
        deadline: U256,
    ) -> Result<LiquidityReceipt> {
        self.check_router(router)?;
        self.ensure_live(deadline)?;
        self.token(token)?;
        let overflow = || ScreenerError::Overflow("liquidity");

        let pool = self.pools.get(&token).cloned().unwrap_or_default();
        let (token_used, native_used) = if pool.total_supply.is_zero() {
            (token_amount, native_amount)
        } else {
            let native_optimal = token_amount
                .checked_mul(pool.native_reserve)
                .ok_or_else(overflow)?
                / pool.token_reserve;
            if native_optimal <= native_amount {
                (token_amount, native_optimal)
            } else {
                let token_optimal = native_amount
                    .checked_mul(pool.token_reserve)
                    .ok_or_else(overflow)?
                    / pool.native_reserve;
                (token_optimal, native_amount)
            }
        };

        let mut staged = self.clone();
        staged.debit_native(account, native_used)?;
        let pair = staged.pair_address(token);
        staged.move_tokens(token, account, pair, token_used)?;
        let pair_balance = staged.token(token)?.balance_of(pair);
        let token_added = pair_balance.saturating_sub(pool.token_reserve);

        let liquidity = if pool.total_supply.is_zero() {
            token_added
                .checked_mul(native_used)
                .ok_or_else(overflow)?
                .integer_sqrt()
                .checked_sub(U256::from(MINIMUM_LIQUIDITY))
                .ok_or_else(|| RouterError::new("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED"))?
        } else {
            let by_token = token_added.checked_mul(pool.total_supply).ok_or_else(overflow)? / pool.token_reserve;
            let by_native = native_used.checked_mul(pool.total_supply).ok_or_else(overflow)? / pool.native_reserve;
            by_token.min(by_native)
        };
        if liquidity.is_zero() {
            return Err(RouterError::new("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED").into());
        }

        let pool = staged.pools.entry(token).or_default();
        if pool.total_supply.is_zero() {
            pool.total_supply = U256::from(MINIMUM_LIQUIDITY);
        }
        pool.total_supply = pool.total_supply.checked_add(liquidity).ok_or_else(overflow)?;
        *pool.shares.entry(recipient).or_default() += liquidity;
        pool.token_reserve = pair_balance;
        pool.native_reserve = pool.native_reserve.checked_add(native_used).ok_or_else(overflow)?;

        *self = staged;
        tracing::debug!(
            "Listed {:?}: {} tokens / {} native, {} LP to {:?}",
            token, token_used, native_used, liquidity, recipient
        );

        Ok(LiquidityReceipt {
            token_amount: token_used,
            native_amount: native_used,
            liquidity,
        })
    }

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        self.move_tokens(token, from, to, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::exp10(18) * n
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn listed(behavior: TokenBehavior) -> (SandboxExchange, Address) {
        let router = addr(0x01);
        let owner = addr(0x0a);
        let token = addr(0x70);
        let mut exchange = SandboxExchange::new(router);
        exchange.deploy_token(token, owner, ether(1_000_000), behavior).unwrap();
        exchange.allocate_native(owner, ether(5)).unwrap();
        let deadline = exchange.deadline();
        exchange
            .add_liquidity(router, token, owner, ether(1000), ether(5), owner, deadline)
            .unwrap();
        (exchange, token)
    }

    #[test]
    fn test_amount_out_matches_uniswap_formula() {
        let out = get_amount_out(ether(1), ether(5), ether(1000)).unwrap();
        // 997 * 1000 / (5000 + 997) tokens
        assert_eq!(out, ether(1) * 997 * 1000 / 5997);
    }

    #[test]
    fn test_listing_sets_reserves_and_shares() {
        let (exchange, token) = listed(TokenBehavior::Standard);

        assert_eq!(exchange.pool_reserves(token), Some((ether(1000), ether(5))));
        let expected = (ether(1000) * ether(5)).integer_sqrt() - MINIMUM_LIQUIDITY;
        assert_eq!(exchange.liquidity_of(token, addr(0x0a)), expected);
    }

    #[test]
    fn test_expired_deadline_is_rejected() {
        let router = addr(0x01);
        let mut exchange = SandboxExchange::new(router);
        exchange.deploy_token(addr(0x70), addr(0x0a), ether(10), TokenBehavior::Standard).unwrap();
        exchange.allocate_native(addr(0x0a), ether(1)).unwrap();

        let stale = U256::from(exchange.timestamp() - 1);
        let err = exchange
            .add_liquidity(router, addr(0x70), addr(0x0a), ether(1), ether(1), addr(0x0a), stale)
            .unwrap_err();
        assert_eq!(err.as_router_error(), Some(&RouterError::new("UniswapV2Router: EXPIRED")));
    }

    #[test]
    fn test_buy_then_sell_conserves_native() {
        let (mut exchange, token) = listed(TokenBehavior::Standard);
        let trader = addr(0x24);
        exchange.allocate_native(trader, ether(1)).unwrap();

        let bought = exchange.buy_with_native(addr(0x01), token, trader, ether(1)).unwrap();
        let recovered = exchange.sell_for_native(addr(0x01), token, trader, bought).unwrap();

        let (_, native_reserve) = exchange.pool_reserves(token).unwrap();
        assert_eq!(native_reserve + recovered, ether(6));
        assert!(recovered < ether(1));
    }

    #[test]
    fn test_failed_sell_is_atomic() {
        let (mut exchange, token) = listed(TokenBehavior::SellBlocked);
        let trader = addr(0x24);
        exchange.allocate_native(trader, ether(1)).unwrap();
        let bought = exchange.buy_with_native(addr(0x01), token, trader, ether(1)).unwrap();
        let reserves = exchange.pool_reserves(token);

        assert!(exchange.sell_for_native(addr(0x01), token, trader, bought).is_err());
        assert_eq!(exchange.pool_reserves(token), reserves);
        assert_eq!(exchange.token_balance(token, trader).unwrap(), bought);
    }

    #[test]
    fn test_unknown_router_and_missing_pool() {
        let (mut exchange, token) = listed(TokenBehavior::Standard);
        exchange.allocate_native(addr(0x24), ether(1)).unwrap();

        let err = exchange.buy_with_native(addr(0x02), token, addr(0x24), ether(1)).unwrap_err();
        assert!(err.as_router_error().is_some());

        exchange.deploy_token(addr(0x71), addr(0x0a), ether(10), TokenBehavior::Standard).unwrap();
        let err = exchange.buy_with_native(addr(0x01), addr(0x71), addr(0x24), ether(1)).unwrap_err();
        assert!(err.as_router_error().is_some());
    }

    #[test]
    fn test_fee_above_full_is_rejected_at_deploy() {
        let mut exchange = SandboxExchange::new(addr(0x01));
        let err = exchange
            .deploy_token(addr(0x70), addr(0x0a), ether(10), TokenBehavior::TransferFee { bps: 20_000 })
            .unwrap_err();
        assert!(matches!(err, ScreenerError::SimulationError(_)));
    }

    #[test]
    fn test_fee_token_buy_delivers_less_than_quoted() {
        let (mut exchange, token) = listed(TokenBehavior::TransferFee { bps: 500 });
        exchange.allocate_native(addr(0x24), ether(1)).unwrap();

        let quoted = get_amount_out(ether(1), ether(5), ether(1000)).unwrap();
        let bought = exchange.buy_with_native(addr(0x01), token, addr(0x24), ether(1)).unwrap();

        assert_eq!(bought, quoted - quoted * 500 / 10_000);
    }
}
