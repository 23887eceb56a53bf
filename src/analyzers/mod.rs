pub mod tolerance;
pub mod fee;

pub use tolerance::ToleranceEvaluator;
pub use fee::FeeEvaluator;

use ethers::types::U256;
use crate::core::RouterAdapter;
use crate::models::ProbeContext;
use crate::utils::{Result, ScreenerError};

/// Install the prober's calling context and fund it with the stake
fn prepare_prober(ledger: &mut dyn RouterAdapter, ctx: &ProbeContext) -> Result<()> {
    if let Some(code) = &ctx.prober_code {
        tracing::debug!("Installing {} bytes of code at prober {:?}", code.len(), ctx.prober);
        ledger.install_code(ctx.prober, code.clone())?;
    }
    ledger.allocate_native(ctx.prober, ctx.stake)
}

/// Buy leg shared by both evaluators; returns the prober's token delta.
///
/// Any failure here is inconclusive: a rejected buy may be the router's
/// fault as much as the token's.
fn acquire_tokens(ledger: &mut dyn RouterAdapter, ctx: &mut ProbeContext) -> Result<U256> {
    let native_before = ledger.native_balance(ctx.prober)?;
    let tokens_before = ledger.token_balance(ctx.token, ctx.prober)?;

    ledger
        .buy_with_native(ctx.router, ctx.token, ctx.prober, ctx.stake)
        .map_err(|e| match e {
            ScreenerError::Router(reason) => {
                tracing::warn!("Buy leg rejected for {:?}: {}", ctx.token, reason);
                ScreenerError::Indeterminate(format!("buy leg rejected: {}", reason))
            }
            other => other,
        })?;

    let native_after = ledger.native_balance(ctx.prober)?;
    let tokens_after = ledger.token_balance(ctx.token, ctx.prober)?;

    let received = balance_delta(tokens_before, tokens_after);
    ctx.tokens_received = Some(received);
    ctx.native_spent = Some(balance_delta(native_after, native_before));

    tracing::debug!("Buy leg: {} native -> {} tokens", ctx.stake, received);
    Ok(received)
}

/// Increase from `before` to `after`; a shrinking balance counts as zero
fn balance_delta(before: U256, after: U256) -> U256 {
    after.checked_sub(before).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_delta_never_wraps() {
        assert_eq!(balance_delta(U256::from(5), U256::from(8)), U256::from(3));
        assert_eq!(balance_delta(U256::from(8), U256::from(5)), U256::zero());
        assert_eq!(balance_delta(U256::MAX, U256::zero()), U256::zero());
    }
}
