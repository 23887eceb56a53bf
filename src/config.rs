//! Screener configuration: TOML file, then environment and CLI overrides
use std::path::Path;
use std::time::Duration;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use crate::core::SimulationRunner;
use crate::models::{ExecutionMode, ProbePolicy, ToleranceParameter};
use crate::utils::{Result, ScreenerError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub rpc_url: Option<String>,
    pub router: Option<Address>,
    pub mode: ExecutionMode,
    pub timeout_secs: u64,
    pub deadline_buffer_secs: u64,
    pub gas_limit: u64,
    pub probe: ProbeConfig,
}

/// `[probe]` table; amounts in ether unless noted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub stake: String,
    pub tolerance: String,
    /// Decimal token amount in base units
    pub fee_transfer_amount: Option<String>,
    pub prober: Option<Address>,
    pub recipient: Option<Address>,
    /// Hex-encoded runtime code installed at the prober
    pub prober_code: Option<String>,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            router: None,
            mode: ExecutionMode::DryRun,
            timeout_secs: 30,
            deadline_buffer_secs: 180,
            gas_limit: 5_000_000,
            probe: ProbeConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stake: "1".to_string(),
            tolerance: "0.01".to_string(),
            fee_transfer_amount: None,
            prober: None,
            recipient: None,
            prober_code: None,
        }
    }
}

impl ScreenerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScreenerError::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ScreenerError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tolerance(&self) -> Result<ToleranceParameter> {
        ToleranceParameter::from_ether_str(&self.probe.tolerance)
    }

    pub fn policy(&self) -> Result<ProbePolicy> {
        let stake = ethers::utils::parse_ether(&self.probe.stake)
            .map_err(|e| ScreenerError::ConfigError(format!("Invalid stake {:?}: {}", self.probe.stake, e)))?;
        if stake.is_zero() {
            return Err(ScreenerError::ConfigError("stake must be positive".into()));
        }

        let mut policy = ProbePolicy::new(stake);

        if let Some(amount) = &self.probe.fee_transfer_amount {
            let amount = U256::from_dec_str(amount)
                .map_err(|e| ScreenerError::ConfigError(format!("Invalid fee_transfer_amount {:?}: {}", amount, e)))?;
            policy = policy.with_fee_transfer_amount(amount);
        }
        if let Some(prober) = self.probe.prober {
            policy = policy.with_prober(prober);
        }
        if let Some(recipient) = self.probe.recipient {
            policy = policy.with_recipient(recipient);
        }
        if let Some(code) = &self.probe.prober_code {
            let code = hex::decode(code.trim_start_matches("0x"))
                .map_err(|e| ScreenerError::ConfigError(format!("Invalid prober_code: {}", e)))?;
            policy = policy.with_prober_code(Bytes::from(code));
        }

        Ok(policy)
    }

    pub fn runner(&self) -> Result<SimulationRunner> {
        Ok(SimulationRunner::new(self.policy()?)
            .with_mode(self.mode)
            .with_timeout(self.timeout())
            .with_deadline_buffer(self.deadline_buffer_secs)
            .with_gas_limit(self.gas_limit))
    }
}
