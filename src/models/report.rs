use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use serde::Serialize;
use super::{CheckKind, ExecutionMode, ProbeContext, SimulationOutcome};

/// Detailed result of one check, including what each leg observed
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub token: Address,
    pub router: Address,
    pub check: CheckKind,
    pub mode: ExecutionMode,
    pub outcome: SimulationOutcome,
    pub stake: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_received: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_spent: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_recovered: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_amount: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited: Option<U256>,
    pub elapsed_ms: u64,
}

impl CheckReport {
    pub fn from_context(
        ctx: &ProbeContext,
        check: CheckKind,
        mode: ExecutionMode,
        outcome: SimulationOutcome,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            token: ctx.token,
            router: ctx.router,
            check,
            mode,
            outcome,
            stake: ctx.stake,
            tokens_received: ctx.tokens_received,
            native_spent: ctx.native_spent,
            native_recovered: ctx.native_recovered,
            transfer_amount: ctx.transfer_amount,
            credited: ctx.credited,
            elapsed_ms,
        }
    }

    /// Report for a probe that never produced observations
    pub fn inconclusive(
        router: Address,
        token: Address,
        check: CheckKind,
        mode: ExecutionMode,
        stake: U256,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self {
            token,
            router,
            check,
            mode,
            outcome: SimulationOutcome::indeterminate(reason),
            stake,
            tokens_received: None,
            native_spent: None,
            native_recovered: None,
            transfer_amount: None,
            credited: None,
            elapsed_ms: 0,
        }
    }

    /// Recovered native as a percentage of the stake, when the sell leg completed
    pub fn recovery_percent(&self) -> Option<f64> {
        let recovered = self.native_recovered?;
        if self.stake.is_zero() {
            return None;
        }
        // basis points keep the division in integer space
        let bps = recovered.checked_mul(U256::from(10_000))? / self.stake;
        if bps > U256::from(u64::MAX) {
            return None;
        }
        Some(bps.as_u64() as f64 / 100.0)
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════════")?;
        writeln!(f, "  {} {}", self.outcome.label(), self.check)?;
        writeln!(f, "═══════════════════════════════════════════════════════════")?;
        writeln!(f, "Token:  {:?}", self.token)?;
        writeln!(f, "Router: {:?}", self.router)?;
        writeln!(f, "Mode:   {:?}", self.mode)?;
        writeln!(f, "Stake:  {} native", format_ether(self.stake))?;

        if let Some(received) = self.tokens_received {
            writeln!(f, "Bought: {} tokens", format_ether(received))?;
        }
        if let Some(recovered) = self.native_recovered {
            match self.recovery_percent() {
                Some(pct) => writeln!(f, "Sold:   {} native ({:.2}% of stake)", format_ether(recovered), pct)?,
                None => writeln!(f, "Sold:   {} native", format_ether(recovered))?,
            }
        }
        if let (Some(sent), Some(credited)) = (self.transfer_amount, self.credited) {
            writeln!(f, "Transfer: {} sent, {} credited", format_ether(sent), format_ether(credited))?;
        }
        if let SimulationOutcome::Indeterminate { reason } = &self.outcome {
            writeln!(f, "Reason: {}", reason)?;
        }

        writeln!(f, "Elapsed: {} ms", self.elapsed_ms)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProbePolicy;

    #[test]
    fn test_recovery_percent() {
        let mut ctx = ProbeContext::new(Address::repeat_byte(1), Address::repeat_byte(2), &ProbePolicy::default());
        ctx.native_recovered = Some(U256::exp10(16) * 99);

        let report = CheckReport::from_context(&ctx, CheckKind::Tolerance, ExecutionMode::DryRun, SimulationOutcome::Pass, 3);
        assert_eq!(report.recovery_percent(), Some(99.0));
        assert!(report.to_string().contains("PASSED ToleranceCheck"));
    }

    #[test]
    fn test_recovery_percent_out_of_range() {
        let mut ctx = ProbeContext::new(Address::repeat_byte(1), Address::repeat_byte(2), &ProbePolicy::new(U256::one()));
        ctx.native_recovered = Some(U256::from(u64::MAX));

        let report = CheckReport::from_context(&ctx, CheckKind::Tolerance, ExecutionMode::Commit, SimulationOutcome::Pass, 0);
        assert_eq!(report.recovery_percent(), None);
    }

    #[test]
    fn test_inconclusive_report_serializes_reason() {
        let report = CheckReport::inconclusive(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            CheckKind::TransferFee,
            ExecutionMode::DryRun,
            U256::exp10(18),
            "probe exceeded its deadline",
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "indeterminate");
        assert_eq!(json["check"], "transfer_fee");
        assert!(json.get("tokens_received").is_none());
        assert_eq!(report.recovery_percent(), None);
    }
}
