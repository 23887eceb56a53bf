//! Per-invocation probe state and the policy it is created from

use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Which evaluator a check runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Buy-then-sell round trip against a tolerance
    Tolerance,
    /// Exact-delivery transfer between two engine accounts
    TransferFee,
}

impl CheckKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::Tolerance => "ToleranceCheck",
            CheckKind::TransferFee => "InternalFee",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether a probe may leave its mutations on the ledger it ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run on a snapshot that is discarded afterwards
    #[default]
    DryRun,
    /// Run on the shared ledger and keep whatever the legs changed
    Commit,
}

/// Probe parameters shared by every check a runner performs
#[derive(Debug, Clone)]
pub struct ProbePolicy {
    /// Native amount allocated to the prober and spent on the buy leg
    pub stake: U256,
    /// Tokens moved by the fee probe; `None` moves the whole acquired holding
    pub fee_transfer_amount: Option<U256>,
    /// Account that performs the legs
    pub prober: Address,
    /// Second engine-owned account, receiver of the fee probe transfer
    pub recipient: Address,
    /// Code installed at the prober so the probe runs as contract code
    pub prober_code: Option<Bytes>,
}

impl ProbePolicy {
    pub const DEFAULT_PROBER: Address = ethers::types::H160([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x24,
    ]);
    pub const DEFAULT_RECIPIENT: Address = ethers::types::H160([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x25,
    ]);

    pub fn new(stake: U256) -> Self {
        Self {
            stake,
            ..Self::default()
        }
    }

    pub fn with_fee_transfer_amount(mut self, amount: U256) -> Self {
        self.fee_transfer_amount = Some(amount);
        self
    }

    pub fn with_prober(mut self, prober: Address) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_recipient(mut self, recipient: Address) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn with_prober_code(mut self, code: Bytes) -> Self {
        self.prober_code = Some(code);
        self
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            stake: U256::exp10(18),
            fee_transfer_amount: None,
            prober: Self::DEFAULT_PROBER,
            recipient: Self::DEFAULT_RECIPIENT,
            prober_code: None,
        }
    }
}

/// Stage of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStage {
    Start,
    Buying,
    Selling,
    ComparingTolerance,
    Transferring,
    Passed,
    Failed,
    Indeterminate,
}

impl ProbeStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProbeStage::Passed | ProbeStage::Failed | ProbeStage::Indeterminate
        )
    }
}

/// Ephemeral record owned by exactly one check invocation
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub router: Address,
    pub token: Address,
    pub prober: Address,
    pub recipient: Address,
    pub prober_code: Option<Bytes>,
    pub stake: U256,
    pub stage: ProbeStage,

    /// Token balance delta of the prober across the buy leg
    pub tokens_received: Option<U256>,
    /// Native balance delta of the prober across the buy leg
    pub native_spent: Option<U256>,
    /// Native balance delta of the prober across the sell leg
    pub native_recovered: Option<U256>,
    /// Tokens instructed in the fee probe transfer
    pub transfer_amount: Option<U256>,
    /// Tokens credited to the recipient by that transfer
    pub credited: Option<U256>,
}

impl ProbeContext {
    pub fn new(router: Address, token: Address, policy: &ProbePolicy) -> Self {
        Self {
            router,
            token,
            prober: policy.prober,
            recipient: policy.recipient,
            prober_code: policy.prober_code.clone(),
            stake: policy.stake,
            stage: ProbeStage::Start,
            tokens_received: None,
            native_spent: None,
            native_recovered: None,
            transfer_amount: None,
            credited: None,
        }
    }

    pub fn advance(&mut self, next: ProbeStage) {
        if self.stage.is_terminal() {
            tracing::warn!("Probe for {:?} already finished as {:?}, ignoring {:?}", self.token, self.stage, next);
            return;
        }
        tracing::debug!("Probe {:?}: {:?} -> {:?}", self.token, self.stage, next);
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = ProbePolicy::default();
        assert_eq!(policy.stake, U256::exp10(18));
        assert_eq!(
            format!("{:?}", policy.prober),
            "0x0000000000000000000000000000000000000124"
        );
        assert_ne!(policy.prober, policy.recipient);
        assert!(policy.prober_code.is_none());
    }

    #[test]
    fn test_terminal_stage_is_sticky() {
        let mut ctx = ProbeContext::new(Address::repeat_byte(1), Address::repeat_byte(2), &ProbePolicy::default());
        assert_eq!(ctx.stage, ProbeStage::Start);

        ctx.advance(ProbeStage::Buying);
        ctx.advance(ProbeStage::Failed);
        ctx.advance(ProbeStage::Selling);
        assert_eq!(ctx.stage, ProbeStage::Failed);
    }

    #[test]
    fn test_check_names() {
        assert_eq!(CheckKind::Tolerance.to_string(), "ToleranceCheck");
        assert_eq!(CheckKind::TransferFee.to_string(), "InternalFee");
    }
}
