//! RouterAdapter over an in-process EVM
//!
//! Router and token calls are executed by REVM against a `CacheDB` layered on
//! any read-only state source (a live fork in production). Writes stay in the
//! cache; nothing is ever broadcast.
use std::fmt::Debug;
use ethers::types::{Address, Bytes, U256};
use revm::db::CacheDB;
use revm::primitives::{
    AccountInfo, Bytecode, Bytes as RevmBytes, EVMError, ExecutionResult, Output,
    ResultAndState, TransactTo, U256 as RevmU256,
};
use revm::db::DatabaseRef;
use revm::{Database, DatabaseCommit, EVM};
use crate::blockchain::fork_db::{to_ethers_u256, to_revm_address, to_revm_u256};
use crate::blockchain::BlockContext;
use crate::contracts::{decode_revert_reason, ERC20_ABI, ROUTER_ABI};
use crate::core::{LiquidityReceipt, RouterAdapter};
use crate::utils::{Result, RouterError, ScreenerError};

pub struct EvmRouter<D: DatabaseRef> {
    evm: EVM<CacheDB<D>>,
    deadline_buffer: u64,
    gas_limit: u64,
}

impl<D> EvmRouter<D>
where
    D: DatabaseRef,
    D::Error: Into<ScreenerError> + Debug,
{
    pub const DEFAULT_DEADLINE_BUFFER: u64 = 180;
    pub const DEFAULT_GAS_LIMIT: u64 = 5_000_000;

    /// Build an EVM pinned to `block`, reading state through `db`
    pub fn new(db: D, block: &BlockContext) -> Self {
        let mut evm = EVM::new();
        evm.database(CacheDB::new(db));

        evm.env.cfg.chain_id = block.chain_id;
        // the prober may carry installed code and still originate calls
        evm.env.cfg.disable_eip3607 = true;
        evm.env.block.number = RevmU256::from(block.number);
        evm.env.block.timestamp = RevmU256::from(block.timestamp);
        evm.env.block.basefee = RevmU256::ZERO;
        evm.env.tx.gas_price = RevmU256::ZERO;

        Self {
            evm,
            deadline_buffer: Self::DEFAULT_DEADLINE_BUFFER,
            gas_limit: Self::DEFAULT_GAS_LIMIT,
        }
    }

    pub fn with_deadline_buffer(mut self, seconds: u64) -> Self {
        self.deadline_buffer = seconds;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Swap deadline: block timestamp plus the configured buffer
    pub fn deadline(&self) -> U256 {
        to_ethers_u256(self.evm.env.block.timestamp) + U256::from(self.deadline_buffer)
    }

    fn db_mut(&mut self) -> Result<&mut CacheDB<D>> {
        self.evm
            .db
            .as_mut()
            .ok_or_else(|| ScreenerError::SimulationError("EVM has no database attached".into()))
    }

    fn account_info(&mut self, account: Address) -> Result<AccountInfo> {
        let info = self
            .db_mut()?
            .basic(to_revm_address(account))
            .map_err(Into::<ScreenerError>::into)?;
        Ok(info.unwrap_or_default())
    }

    /// Execute one call; reverts and halts become `RouterError`s
    fn execute(
        &mut self,
        caller: Address,
        to: Address,
        data: Bytes,
        value: U256,
        commit: bool,
    ) -> Result<RevmBytes> {
        let evm = &mut self.evm;
        evm.env.tx.caller = to_revm_address(caller);
        evm.env.tx.transact_to = TransactTo::Call(to_revm_address(to));
        evm.env.tx.data = RevmBytes::from(data.to_vec());
        evm.env.tx.value = to_revm_u256(value);
        evm.env.tx.gas_limit = self.gas_limit;

        let ResultAndState { result, state } = evm.transact().map_err(|e| match e {
            EVMError::Database(e) => e.into(),
            other => ScreenerError::SimulationError(format!("REVM exec failed: {:?}", other)),
        })?;

        match result {
            ExecutionResult::Success { output, gas_used, .. } => {
                tracing::trace!("Call to {:?} succeeded, gas={}", to, gas_used);
                if commit {
                    self.db_mut()?.commit(state);
                }
                match output {
                    Output::Call(data) => Ok(data),
                    Output::Create(data, _) => Ok(data),
                }
            }
            ExecutionResult::Revert { output, .. } => {
                let reason = decode_revert_reason(&output);
                tracing::debug!("❌ Call to {:?} reverted: {}", to, reason);
                Err(RouterError::new(reason).into())
            }
            ExecutionResult::Halt { reason, .. } => {
                tracing::debug!("⛔ Call to {:?} halted: {:?}", to, reason);
                Err(RouterError::new(format!("halted: {:?}", reason)).into())
            }
        }
    }

    fn weth(&mut self, router: Address) -> Result<Address> {
        let data = ROUTER_ABI.encode("WETH", ())?;
        let output = self.execute(Address::zero(), router, data, U256::zero(), false)?;
        Ok(ROUTER_ABI.decode_output("WETH", output)?)
    }

    fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) -> Result<()> {
        let data = ERC20_ABI.encode("approve", (spender, amount))?;
        self.execute(owner, token, data, U256::zero(), true)?;
        Ok(())
    }
}

impl<D> Clone for EvmRouter<D>
where
    D: DatabaseRef + Clone,
{
    fn clone(&self) -> Self {
        let mut evm = EVM::new();
        evm.env = self.evm.env.clone();
        evm.db = self.evm.db.clone();
        Self {
            evm,
            deadline_buffer: self.deadline_buffer,
            gas_limit: self.gas_limit,
        }
    }
}

impl<D> RouterAdapter for EvmRouter<D>
where
    D: DatabaseRef,
    D::Error: Into<ScreenerError> + Debug,
{
    fn allocate_native(&mut self, account: Address, amount: U256) -> Result<()> {
        let mut info = self.account_info(account)?;
        info.balance = info
            .balance
            .checked_add(to_revm_u256(amount))
            .ok_or(ScreenerError::Overflow("native allocation"))?;
        self.db_mut()?.insert_account_info(to_revm_address(account), info);
        Ok(())
    }

    fn install_code(&mut self, account: Address, code: Bytes) -> Result<()> {
        let mut info = self.account_info(account)?;
        let bytecode = Bytecode::new_raw(RevmBytes::from(code.to_vec()));
        info.code_hash = bytecode.hash_slow();
        info.code = Some(bytecode);
        self.db_mut()?.insert_account_info(to_revm_address(account), info);
        Ok(())
    }

    fn native_balance(&mut self, account: Address) -> Result<U256> {
        Ok(to_ethers_u256(self.account_info(account)?.balance))
    }

    fn token_balance(&mut self, token: Address, holder: Address) -> Result<U256> {
        let data = ERC20_ABI.encode("balanceOf", holder)?;
        let output = self.execute(Address::zero(), token, data, U256::zero(), false)?;
        Ok(ERC20_ABI.decode_output("balanceOf", output)?)
    }

    fn buy_with_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        native_in: U256,
    ) -> Result<U256> {
        let weth = self.weth(router)?;
        let deadline = self.deadline();
        let before = self.token_balance(token, account)?;

        let data = ROUTER_ABI.encode(
            "swapExactETHForTokensSupportingFeeOnTransferTokens",
            (U256::zero(), vec![weth, token], account, deadline),
        )?;
        self.execute(account, router, data, native_in, true)?;

        let after = self.token_balance(token, account)?;
        Ok(after.saturating_sub(before))
    }

    fn sell_for_native(
        &mut self,
        router: Address,
        token: Address,
        account: Address,
        token_in: U256,
    ) -> Result<U256> {
        let weth = self.weth(router)?;
        let deadline = self.deadline();
        self.approve(token, account, router, token_in)?;
        let before = self.native_balance(account)?;

        let data = ROUTER_ABI.encode(
            "swapExactTokensForETHSupportingFeeOnTransferTokens",
            (token_in, U256::zero(), vec![token, weth], account, deadline),
        )?;
        self.execute(account, router, data, U256::zero(), true)?;

        let after = self.native_balance(account)?;
        Ok(after.saturating_sub(before))
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
        self.approve(token, account, router, token_amount)?;

        let data = ROUTER_ABI.encode(
            "addLiquidityETH",
            (token, token_amount, U256::zero(), U256::zero(), recipient, deadline),
        )?;
        let output = self.execute(account, router, data, native_amount, true)?;

        let (token_amount, native_amount, liquidity): (U256, U256, U256) =
            ROUTER_ABI.decode_output("addLiquidityETH", output)?;
        Ok(LiquidityReceipt {
            token_amount,
            native_amount,
            liquidity,
        })
    }

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        let data = ERC20_ABI.encode("transfer", (to, amount))?;
        let output = self.execute(from, token, data, U256::zero(), true)?;

        // Non-standard tokens return nothing
        if output.is_empty() {
            return Ok(());
        }
        let ok: bool = ERC20_ABI.decode_output("transfer", output)?;
        if ok {
            Ok(())
        } else {
            Err(RouterError::new("transfer returned false").into())
        }
    }
}
