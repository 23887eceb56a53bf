use std::time::Duration;
use thiserror::Error;

/// Rejection raised by the exchange or by the token's own transfer logic
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct RouterError {
    pub reason: String,
}

impl RouterError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),

    #[error("Router rejected operation: {0}")]
    Router(#[from] RouterError),

    #[error("Probe could not reach a verdict: {0}")]
    Indeterminate(String),

    #[error("Probe exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("Malformed verdict output: 0x{0}")]
    MalformedVerdict(String),

    #[error("RPC error: {0}")]
    RpcError(#[from] ethers::providers::ProviderError),

    #[error("ABI error: {0}")]
    AbiError(#[from] ethers::contract::AbiError),

    #[error("Simulation failed: {0}")]
    SimulationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScreenerError {
    /// Errors the caller caused before any ledger was touched
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ScreenerError::InvalidAddress(_) | ScreenerError::InvalidTolerance(_)
        )
    }

    /// Returns the router rejection if this error is one
    pub fn as_router_error(&self) -> Option<&RouterError> {
        match self {
            ScreenerError::Router(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::convert::Infallible> for ScreenerError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, ScreenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_error_classification() {
        assert!(ScreenerError::InvalidAddress("0x0".into()).is_caller_error());
        assert!(ScreenerError::InvalidTolerance("too big".into()).is_caller_error());
        assert!(!ScreenerError::Router(RouterError::new("K")).is_caller_error());
        assert!(!ScreenerError::Timeout(Duration::from_secs(1)).is_caller_error());
    }

    #[test]
    fn test_router_error_display() {
        let err: ScreenerError = RouterError::new("TransferHelper: TRANSFER_FROM_FAILED").into();
        assert_eq!(
            err.to_string(),
            "Router rejected operation: TransferHelper: TRANSFER_FROM_FAILED"
        );
        assert!(err.as_router_error().is_some());
    }
}
