use ethers::prelude::*;
use std::sync::Arc;
use crate::contracts::IERC20;
use crate::utils::{Result, ScreenerError};

/// Block a fork is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub timestamp: u64,
    pub chain_id: u64,
}

/// Blockchain RPC client
#[derive(Debug)]
pub struct BlockchainClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl BlockchainClient {
    /// Create a new client
    pub async fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ScreenerError::RpcError(
                ProviderError::CustomError(format!("Invalid RPC URL: {}", e))
            ))?;

        let provider = Arc::new(provider);

        let chain_id = provider.get_chainid().await?;

        tracing::info!("Connected to chain ID: {} ({})", chain_id, chain_name(chain_id.as_u64()));

        Ok(Self {
            provider,
            chain_id: chain_id.as_u64(),
        })
    }

    pub fn provider(&self) -> &Arc<Provider<Http>> {
        &self.provider
    }

    /// Number and timestamp of the latest block
    pub async fn block_context(&self) -> Result<BlockContext> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await?
            .ok_or_else(|| ScreenerError::SimulationError("latest block not available".into()))?;

        let number = block
            .number
            .ok_or_else(|| ScreenerError::SimulationError("latest block has no number".into()))?;

        Ok(BlockContext {
            number: number.as_u64(),
            timestamp: block.timestamp.as_u64(),
            chain_id: self.chain_id,
        })
    }

    /// Display name and symbol of an ERC20, for reporting only
    pub async fn token_label(&self, token: Address) -> Result<String> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let name = erc20
            .name()
            .call()
            .await
            .map_err(|e| ScreenerError::SimulationError(format!("name() failed for {:?}: {}", token, e)))?;
        let symbol = erc20.symbol().call().await.unwrap_or_default();

        if symbol.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{} ({})", name, symbol))
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Human-readable chain name
pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "Ethereum Mainnet",
        56 => "BNB Smart Chain",
        137 => "Polygon",
        369 => "PulseChain",
        8453 => "Base",
        42161 => "Arbitrum One",
        31337 => "Local Devnet",
        _ => "Unknown Chain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_names() {
        assert_eq!(chain_name(1), "Ethereum Mainnet");
        assert_eq!(chain_name(369), "PulseChain");
        assert_eq!(chain_name(999_999), "Unknown Chain");
    }

    #[tokio::test]
    async fn test_invalid_rpc_url_is_rejected() {
        let err = BlockchainClient::new("not a url").await.unwrap_err();
        assert!(matches!(err, ScreenerError::RpcError(_)));
    }

    #[tokio::test]
    #[ignore = "requires RPC access"]
    async fn test_latest_block_context() {
        let client = BlockchainClient::new("https://rpc.pulsechain.com")
            .await
            .expect("Failed to connect");

        let block = client.block_context().await.expect("Failed to fetch block");
        assert_eq!(block.chain_id, 369);
        assert!(block.number > 0);
        assert!(block.timestamp > 0);
    }
}
