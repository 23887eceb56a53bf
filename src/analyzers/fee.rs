//! Transfer-fee check: move tokens between two engine accounts and compare delivery

use ethers::types::U256;
use crate::core::{Evaluator, RouterAdapter};
use crate::models::{ProbeContext, ProbeStage, Verdict};
use crate::utils::{Result, ScreenerError};
use super::{acquire_tokens, balance_delta, prepare_prober};

/// Zero-tolerance detector for fee-on-transfer tokens
pub struct FeeEvaluator {
    /// `None` transfers the whole acquired holding
    transfer_amount: Option<U256>,
}

impl FeeEvaluator {
    pub fn new(transfer_amount: Option<U256>) -> Self {
        Self { transfer_amount }
    }
}

impl Evaluator for FeeEvaluator {
    fn name(&self) -> &'static str {
        "transfer-fee"
    }

    fn evaluate(&self, ledger: &mut dyn RouterAdapter, ctx: &mut ProbeContext) -> Result<Verdict> {
        tracing::info!("🔬 Transfer fee probe for {:?}", ctx.token);

        ctx.advance(ProbeStage::Buying);
        prepare_prober(ledger, ctx)?;
        let received = acquire_tokens(ledger, ctx)?;

        if received.is_zero() {
            return Err(ScreenerError::Indeterminate(
                "buy leg delivered no tokens to transfer".to_string(),
            ));
        }

        let amount = self.transfer_amount.unwrap_or(received);
        if amount.is_zero() || amount > received {
            return Err(ScreenerError::Indeterminate(format!(
                "transfer amount {} not covered by acquired holding {}",
                amount, received
            )));
        }
        ctx.transfer_amount = Some(amount);

        ctx.advance(ProbeStage::Transferring);
        let before = ledger.token_balance(ctx.token, ctx.recipient)?;

        match ledger.transfer(ctx.token, ctx.prober, ctx.recipient, amount) {
            Ok(()) => {}
            Err(ScreenerError::Router(reason)) => {
                tracing::warn!("❌ Transfer reverted for {:?}: {}", ctx.token, reason);
                return Ok(Verdict::Fail);
            }
            Err(e) => return Err(e),
        }

        let after = ledger.token_balance(ctx.token, ctx.recipient)?;
        let credited = balance_delta(before, after);
        ctx.credited = Some(credited);

        let verdict = Verdict::from_bool(credited == amount);
        if verdict == Verdict::Fail {
            tracing::warn!("❌ {:?} delivered {} of {} instructed", ctx.token, credited, amount);
        }
        Ok(verdict)
    }
}
