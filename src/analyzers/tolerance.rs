//! Round-trip tolerance check: buy, sell back, compare native recovered to native spent

use crate::core::{Evaluator, RouterAdapter};
use crate::models::{ProbeContext, ProbeStage, ToleranceParameter, Verdict};
use crate::utils::{Result, ScreenerError};
use super::{acquire_tokens, balance_delta, prepare_prober};

/// Detects blocked-resale tokens and excessive round-trip taxes
pub struct ToleranceEvaluator {
    tolerance: ToleranceParameter,
}

impl ToleranceEvaluator {
    pub fn new(tolerance: ToleranceParameter) -> Self {
        Self { tolerance }
    }
}

impl Evaluator for ToleranceEvaluator {
    fn name(&self) -> &'static str {
        "tolerance"
    }

    fn evaluate(&self, ledger: &mut dyn RouterAdapter, ctx: &mut ProbeContext) -> Result<Verdict> {
        tracing::info!("🔬 Round trip for {:?} with {} native at tolerance {}", ctx.token, ctx.stake, self.tolerance);

        ctx.advance(ProbeStage::Buying);
        prepare_prober(ledger, ctx)?;
        let received = acquire_tokens(ledger, ctx)?;

        if received.is_zero() {
            tracing::warn!("❌ Buy leg delivered no tokens for {:?}", ctx.token);
            return Ok(Verdict::Fail);
        }

        ctx.advance(ProbeStage::Selling);
        let native_before = ledger.native_balance(ctx.prober)?;

        match ledger.sell_for_native(ctx.router, ctx.token, ctx.prober, received) {
            Ok(_) => {}
            Err(ScreenerError::Router(reason)) => {
                tracing::warn!("❌ Sell leg reverted for {:?}: {}", ctx.token, reason);
                return Ok(Verdict::Fail);
            }
            Err(e) => return Err(e),
        }

        let native_after = ledger.native_balance(ctx.prober)?;
        let recovered = balance_delta(native_before, native_after);
        ctx.native_recovered = Some(recovered);

        ctx.advance(ProbeStage::ComparingTolerance);
        let minimum = self.tolerance.minimum_acceptable(ctx.stake)?;
        let verdict = Verdict::from_bool(recovered >= minimum);

        tracing::info!(
            "Round trip for {:?}: recovered {} of {} (minimum {}) -> {:?}",
            ctx.token, recovered, ctx.stake, minimum, verdict
        );
        Ok(verdict)
    }
}
