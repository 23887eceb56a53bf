//! ForkDB - REVM database that reads chain state over RPC at a pinned block
use std::future::Future;
use std::sync::Arc;
use ethers::prelude::*;
use revm::primitives::{
    AccountInfo, Address as RevmAddress, Bytecode, Bytes as RevmBytes,
    B256, U256 as RevmU256, KECCAK_EMPTY,
};
use revm::db::DatabaseRef;
use tokio::time::Instant;
use crate::blockchain::BlockchainClient;
use crate::utils::{Result, ScreenerError};

/// Read-only view of live chain state.
///
/// Every read is a blocking RPC call bounded by the fork's deadline, so it
/// must run off the async worker threads (e.g. inside `spawn_blocking`).
/// Wrap it in a `CacheDB` to layer local writes on top.
#[derive(Clone)]
pub struct ForkDB {
    client: Arc<BlockchainClient>,
    block: BlockId,
    deadline: Instant,
    budget: std::time::Duration,
    runtime_handle: tokio::runtime::Handle,
}

impl ForkDB {
    pub fn new(client: Arc<BlockchainClient>, block_number: u64, deadline: Instant) -> Result<Self> {
        let runtime_handle = tokio::runtime::Handle::try_current()
            .map_err(|_| ScreenerError::SimulationError(
                "No tokio runtime found. ForkDB requires async runtime.".into()
            ))?;

        Ok(Self {
            client,
            block: BlockId::Number(BlockNumber::Number(block_number.into())),
            deadline,
            budget: deadline.saturating_duration_since(Instant::now()),
            runtime_handle,
        })
    }

    /// Drive one RPC future to completion, failing once the deadline passes
    fn fetch<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProviderError>>,
    {
        let deadline = self.deadline;
        match self.runtime_handle.block_on(async move { tokio::time::timeout_at(deadline, fut).await }) {
            Ok(result) => result.map_err(ScreenerError::RpcError),
            Err(_) => {
                tracing::warn!("⏱️  Deadline reached while fetching {}", what);
                Err(ScreenerError::Timeout(self.budget))
            }
        }
    }
}

impl std::fmt::Debug for ForkDB {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForkDB")
            .field("chain_id", &self.client.chain_id())
            .field("block", &self.block)
            .finish()
    }
}

/// Convert ethers Address to REVM Address
pub fn to_revm_address(addr: Address) -> RevmAddress {
    RevmAddress::from_slice(addr.as_bytes())
}

/// Convert REVM Address to ethers Address
pub fn to_ethers_address(addr: RevmAddress) -> Address {
    Address::from_slice(addr.as_slice())
}

pub fn to_revm_u256(value: U256) -> RevmU256 {
    RevmU256::from_limbs(value.0)
}

pub fn to_ethers_u256(value: RevmU256) -> U256 {
    U256(value.into_limbs())
}

impl DatabaseRef for ForkDB {
    type Error = ScreenerError;

    fn basic(&self, address: RevmAddress) -> Result<Option<AccountInfo>> {
        let eth_address = to_ethers_address(address);
        tracing::debug!("Fetching account {:?} from RPC", eth_address);

        let provider = self.client.provider();
        let block = Some(self.block);
        let (balance, nonce, code) = self.fetch("account", async move {
            let balance = provider.get_balance(eth_address, block).await?;
            let nonce = provider.get_transaction_count(eth_address, block).await?;
            let code = provider.get_code(eth_address, block).await?;
            Ok::<(U256, U256, Bytes), ProviderError>((balance, nonce, code))
        })?;

        let (code_hash, bytecode) = if code.is_empty() {
            (KECCAK_EMPTY, None)
        } else {
            let bytecode = Bytecode::new_raw(RevmBytes::from(code.to_vec()));
            (bytecode.hash_slow(), Some(bytecode))
        };

        Ok(Some(AccountInfo {
            balance: to_revm_u256(balance),
            nonce: nonce.as_u64(),
            code_hash,
            code: bytecode,
        }))
    }

    fn code_by_hash(&self, code_hash: B256) -> Result<Bytecode> {
        // Code always arrives with the account in basic_ref
        if code_hash != KECCAK_EMPTY {
            tracing::warn!("Code hash {:?} requested before its account was loaded", code_hash);
        }
        Ok(Bytecode::new())
    }

    fn storage(&self, address: RevmAddress, index: RevmU256) -> Result<RevmU256> {
        let eth_address = to_ethers_address(address);
        let slot = H256::from(index.to_be_bytes::<32>());
        tracing::trace!("Fetching storage {:?}[{:?}] from RPC", eth_address, slot);

        let provider = self.client.provider();
        let block = Some(self.block);
        let value = self.fetch("storage", async move {
            provider.get_storage_at(eth_address, slot, block).await
        })?;

        Ok(RevmU256::from_be_bytes(value.0))
    }

    fn block_hash(&self, number: RevmU256) -> Result<B256> {
        let block_number = number.to::<u64>();

        let provider = self.client.provider();
        let block = self.fetch("block hash", async move {
            provider.get_block(block_number).await
        })?;

        let hash = block.and_then(|b| b.hash).unwrap_or_default();
        Ok(B256::from_slice(hash.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_conversion_preserves_bytes() {
        let addr = Address::repeat_byte(0x42);
        assert_eq!(to_ethers_address(to_revm_address(addr)), addr);
    }

    #[test]
    fn test_u256_conversion_preserves_value() {
        let value = U256::exp10(18) * 1234 + 7;
        assert_eq!(to_ethers_u256(to_revm_u256(value)), value);
        assert_eq!(to_revm_u256(U256::MAX), RevmU256::MAX);
    }
}
