//! Verdict delivery without committing the probe's side effects
//!
//! The evaluator's normal return is intercepted and re-emitted as a single
//! raw output byte. In dry-run mode the evaluator only ever sees a snapshot
//! of the ledger, which is dropped once the byte has been produced.

use crate::core::RouterAdapter;
use crate::models::{ExecutionMode, Verdict};
use crate::utils::Result;

#[derive(Debug, Clone, Copy)]
pub struct ResultChannel {
    mode: ExecutionMode,
}

impl ResultChannel {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    /// Run `probe` and return its verdict as one byte (`0x01` pass, `0x00` fail).
    ///
    /// A probe error is returned as-is so callers can tell an inconclusive
    /// probe from a deliberate `0x00`.
    pub fn run<L, F>(&self, ledger: &mut L, probe: F) -> Result<Vec<u8>>
    where
        L: RouterAdapter + Clone,
        F: FnOnce(&mut dyn RouterAdapter) -> Result<Verdict>,
    {
        let verdict = match self.mode {
            ExecutionMode::DryRun => {
                let mut snapshot = ledger.clone();
                let verdict = probe(&mut snapshot);
                drop(snapshot);
                tracing::trace!("Dry-run snapshot discarded");
                verdict
            }
            ExecutionMode::Commit => {
                tracing::debug!("Running probe against the shared ledger");
                probe(ledger)
            }
        }?;

        Ok(vec![verdict.as_byte()])
    }
}
