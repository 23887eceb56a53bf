use serde::{Deserialize, Serialize};
use crate::utils::{Result, ScreenerError};

/// Two-valued verdict an evaluator reaches when the probe completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub const PASS_BYTE: u8 = 0x01;
    pub const FAIL_BYTE: u8 = 0x00;

    pub fn from_bool(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Verdict::Pass => Self::PASS_BYTE,
            Verdict::Fail => Self::FAIL_BYTE,
        }
    }

    /// Decode raw verdict output; anything but a single 0x00/0x01 byte is malformed
    pub fn decode(output: &[u8]) -> Result<Self> {
        match output {
            [Self::PASS_BYTE] => Ok(Verdict::Pass),
            [Self::FAIL_BYTE] => Ok(Verdict::Fail),
            other => Err(ScreenerError::MalformedVerdict(hex::encode(other))),
        }
    }
}

/// Result of one screening check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimulationOutcome {
    /// Round trip within tolerance / no fee detected
    Pass,
    /// Round trip outside tolerance, sell reverted, or fee detected
    Fail,
    /// The probe itself could not complete
    Indeterminate { reason: String },
}

impl SimulationOutcome {
    pub fn indeterminate(reason: impl std::fmt::Display) -> Self {
        SimulationOutcome::Indeterminate {
            reason: reason.to_string(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, SimulationOutcome::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, SimulationOutcome::Fail)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, SimulationOutcome::Indeterminate { .. })
    }

    /// Orchestration-facing label; the three states never share one
    pub fn label(&self) -> &'static str {
        match self {
            SimulationOutcome::Pass => "PASSED",
            SimulationOutcome::Fail => "FAILED",
            SimulationOutcome::Indeterminate { .. } => "INCONCLUSIVE",
        }
    }
}

impl std::fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationOutcome::Indeterminate { reason } => write!(f, "{}: {}", self.label(), reason),
            _ => write!(f, "{}", self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_bytes() {
        assert_eq!(Verdict::Pass.as_byte(), 0x01);
        assert_eq!(Verdict::Fail.as_byte(), 0x00);
        assert_eq!(Verdict::decode(&[0x01]).unwrap(), Verdict::Pass);
        assert_eq!(Verdict::decode(&[0x00]).unwrap(), Verdict::Fail);
    }

    #[test]
    fn test_malformed_verdicts() {
        for output in [&[][..], &[0x02][..], &[0x00, 0x01][..], &[0xff; 32][..]] {
            let err = Verdict::decode(output).unwrap_err();
            assert!(matches!(err, ScreenerError::MalformedVerdict(_)));
        }
    }

    #[test]
    fn test_labels_are_distinct() {
        let inconclusive = SimulationOutcome::indeterminate("buy leg reverted");
        assert_eq!(SimulationOutcome::Pass.label(), "PASSED");
        assert_eq!(SimulationOutcome::Fail.label(), "FAILED");
        assert_eq!(inconclusive.label(), "INCONCLUSIVE");
        assert_eq!(inconclusive.to_string(), "INCONCLUSIVE: buy leg reverted");
        assert!(!inconclusive.is_pass() && !inconclusive.is_fail());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SimulationOutcome::indeterminate("timeout")).unwrap();
        assert_eq!(json["status"], "indeterminate");
        assert_eq!(json["reason"], "timeout");
        assert_eq!(serde_json::to_value(SimulationOutcome::Pass).unwrap()["status"], "pass");
    }
}
