//! Round-trip tolerance expressed as a fraction of one native unit

use ethers::types::U256;
use ethers::utils::{format_ether, parse_ether};
use serde::{Deserialize, Serialize};
use crate::utils::{Result, ScreenerError};

/// Maximum acceptable fractional loss, scaled so that `DENOMINATOR` means 100%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "U256")]
pub struct ToleranceParameter(U256);

impl ToleranceParameter {
    /// One native unit (10^18), i.e. 100%
    pub const DENOMINATOR: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

    /// Zero tolerance: any loss at all fails the round trip
    pub const ZERO: ToleranceParameter = ToleranceParameter(U256([0, 0, 0, 0]));

    pub fn new(raw: U256) -> Result<Self> {
        if raw > Self::DENOMINATOR {
            return Err(ScreenerError::InvalidTolerance(format!(
                "{} exceeds the denominator {}",
                raw,
                Self::DENOMINATOR
            )));
        }
        Ok(Self(raw))
    }

    /// Parse a decimal fraction such as "0.01" (1%)
    pub fn from_ether_str(value: &str) -> Result<Self> {
        let raw = parse_ether(value).map_err(|e| {
            ScreenerError::InvalidTolerance(format!("cannot parse '{}': {}", value, e))
        })?;
        Self::new(raw)
    }

    pub fn full() -> Self {
        Self(Self::DENOMINATOR)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    /// `stake - stake * tolerance / DENOMINATOR`
    pub fn minimum_acceptable(&self, stake: U256) -> Result<U256> {
        let allowance = stake
            .checked_mul(self.0)
            .ok_or(ScreenerError::Overflow("tolerance allowance"))?
            .checked_div(Self::DENOMINATOR)
            .ok_or(ScreenerError::Overflow("tolerance allowance"))?;

        stake
            .checked_sub(allowance)
            .ok_or(ScreenerError::Overflow("minimum acceptable recovery"))
    }
}

impl TryFrom<U256> for ToleranceParameter {
    type Error = ScreenerError;

    fn try_from(raw: U256) -> Result<Self> {
        Self::new(raw)
    }
}

impl std::fmt::Display for ToleranceParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_ether(self.0))
    }
}
