use std::sync::Arc;
use std::time::Duration;
use ethers::types::{Address, U256};
use tokio::time::Instant;
use crate::analyzers::{FeeEvaluator, ToleranceEvaluator};
use crate::blockchain::{BlockchainClient, EvmRouter, ForkDB};
use crate::core::{Evaluator, ResultChannel, RouterAdapter};
use crate::models::{
    CheckKind, CheckReport, ExecutionMode, ProbeContext, ProbePolicy, ProbeStage,
    SimulationOutcome, ToleranceParameter, Verdict,
};
use crate::utils::{Result, ScreenerError};

/// Orchestrates one end-to-end check per call; holds configuration only
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    policy: ProbePolicy,
    mode: ExecutionMode,
    timeout: Duration,
    deadline_buffer: u64,
    gas_limit: u64,
}

impl SimulationRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(policy: ProbePolicy) -> Self {
        Self {
            policy,
            mode: ExecutionMode::DryRun,
            timeout: Self::DEFAULT_TIMEOUT,
            deadline_buffer: EvmRouter::<ForkDB>::DEFAULT_DEADLINE_BUFFER,
            gas_limit: EvmRouter::<ForkDB>::DEFAULT_GAS_LIMIT,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Seconds added to the block timestamp for router swap deadlines
    pub fn with_deadline_buffer(mut self, seconds: u64) -> Self {
        self.deadline_buffer = seconds;
        self
    }

    /// Gas limit of every call made on a forked chain
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Screen `token` and return only the outcome.
    ///
    /// `Err` is reserved for caller errors; every inconclusive probe is
    /// reported as `SimulationOutcome::Indeterminate`.
    pub fn check_token<L>(
        &self,
        ledger: &mut L,
        router: Address,
        token: Address,
        kind: CheckKind,
        parameter: U256,
    ) -> Result<SimulationOutcome>
    where
        L: RouterAdapter + Clone,
    {
        Ok(self.screen(ledger, router, token, kind, parameter)?.outcome)
    }

    /// Screen `token` and return the outcome with every observed balance
    pub fn screen<L>(
        &self,
        ledger: &mut L,
        router: Address,
        token: Address,
        kind: CheckKind,
        parameter: U256,
    ) -> Result<CheckReport>
    where
        L: RouterAdapter + Clone,
    {
        let tolerance = self.validate(router, token, parameter)?;
        let started = std::time::Instant::now();

        let evaluator: Box<dyn Evaluator> = match kind {
            CheckKind::Tolerance => Box::new(ToleranceEvaluator::new(tolerance)),
            CheckKind::TransferFee => Box::new(FeeEvaluator::new(self.policy.fee_transfer_amount)),
        };

        tracing::info!("🔍 Running {} ({}) for {:?} via router {:?}", kind, evaluator.name(), token, router);

        let mut ctx = ProbeContext::new(router, token, &self.policy);
        let channel = ResultChannel::new(self.mode);

        let output = channel.run(ledger, |probe_ledger| evaluator.evaluate(probe_ledger, &mut ctx));

        let outcome = match output.and_then(|bytes| Verdict::decode(&bytes)) {
            Ok(Verdict::Pass) => {
                ctx.advance(ProbeStage::Passed);
                SimulationOutcome::Pass
            }
            Ok(Verdict::Fail) => {
                ctx.advance(ProbeStage::Failed);
                SimulationOutcome::Fail
            }
            Err(e) => {
                ctx.advance(ProbeStage::Indeterminate);
                tracing::warn!("⚠️  {} for {:?} is inconclusive: {}", kind, token, e);
                SimulationOutcome::indeterminate(e)
            }
        };

        tracing::info!("{} {} for {:?}", outcome.label(), kind, token);

        Ok(CheckReport::from_context(
            &ctx,
            kind,
            self.mode,
            outcome,
            started.elapsed().as_millis() as u64,
        ))
    }

    /// Run `screen` on a blocking thread, bounded by the runner's timeout.
    ///
    /// The ledger is moved into the probe task; in commit mode its mutations
    /// are therefore only visible to that task.
    pub async fn screen_with_deadline<L>(
        &self,
        ledger: L,
        router: Address,
        token: Address,
        kind: CheckKind,
        parameter: U256,
    ) -> Result<CheckReport>
    where
        L: RouterAdapter + Clone + Send + 'static,
    {
        self.validate(router, token, parameter)?;
        let deadline = Instant::now() + self.timeout;
        self.run_blocking(ledger, router, token, kind, parameter, deadline).await
    }

    /// Screen `token` against live chain state without sending a transaction.
    ///
    /// State is read through a fork pinned at the latest block; the probe's
    /// writes never leave this process.
    pub async fn screen_on_chain(
        &self,
        client: Arc<BlockchainClient>,
        router: Address,
        token: Address,
        kind: CheckKind,
        parameter: U256,
    ) -> Result<CheckReport> {
        self.validate(router, token, parameter)?;
        let deadline = Instant::now() + self.timeout;

        let block = match tokio::time::timeout_at(deadline, client.block_context()).await {
            Ok(Ok(block)) => block,
            Ok(Err(e)) => return Ok(self.inconclusive(router, token, kind, e)),
            Err(_) => return Ok(self.inconclusive(router, token, kind, ScreenerError::Timeout(self.timeout))),
        };

        tracing::debug!("Forking state at block {} (timestamp {})", block.number, block.timestamp);

        let db = ForkDB::new(client, block.number, deadline)?;
        let ledger = EvmRouter::new(db, &block)
            .with_deadline_buffer(self.deadline_buffer)
            .with_gas_limit(self.gas_limit);

        self.run_blocking(ledger, router, token, kind, parameter, deadline).await
    }

    async fn run_blocking<L>(
        &self,
        ledger: L,
        router: Address,
        token: Address,
        kind: CheckKind,
        parameter: U256,
        deadline: Instant,
    ) -> Result<CheckReport>
    where
        L: RouterAdapter + Clone + Send + 'static,
    {
        let runner = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut ledger = ledger;
            runner.screen(&mut ledger, router, token, kind, parameter)
        });

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(report)) => report,
            Ok(Err(join_error)) => Ok(self.inconclusive(
                router,
                token,
                kind,
                ScreenerError::SimulationError(format!("probe task aborted: {}", join_error)),
            )),
            Err(_) => {
                tracing::warn!("⏱️  {} for {:?} exceeded {:?}", kind, token, self.timeout);
                Ok(self.inconclusive(router, token, kind, ScreenerError::Timeout(self.timeout)))
            }
        }
    }

    /// Reject malformed requests before any ledger or network access
    fn validate(&self, router: Address, token: Address, parameter: U256) -> Result<ToleranceParameter> {
        if router.is_zero() {
            return Err(ScreenerError::InvalidAddress("router is the zero address".to_string()));
        }
        if token.is_zero() {
            return Err(ScreenerError::InvalidAddress("token is the zero address".to_string()));
        }
        if router == token {
            return Err(ScreenerError::InvalidAddress(format!(
                "router and token are the same address {:?}",
                router
            )));
        }
        if self.policy.prober == self.policy.recipient {
            return Err(ScreenerError::InvalidAddress(
                "prober and recipient must be distinct accounts".to_string(),
            ));
        }
        ToleranceParameter::new(parameter)
    }

    fn inconclusive(&self, router: Address, token: Address, kind: CheckKind, reason: ScreenerError) -> CheckReport {
        CheckReport::inconclusive(router, token, kind, self.mode, self.policy.stake, reason)
    }
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self::new(ProbePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[derive(Clone)]
    struct UntouchableLedger;

    impl RouterAdapter for UntouchableLedger {
        fn allocate_native(&mut self, _: Address, _: U256) -> Result<()> {
            panic!("ledger touched")
        }
        fn install_code(&mut self, _: Address, _: ethers::types::Bytes) -> Result<()> {
            panic!("ledger touched")
        }
        fn native_balance(&mut self, _: Address) -> Result<U256> {
            panic!("ledger touched")
        }
        fn token_balance(&mut self, _: Address, _: Address) -> Result<U256> {
            panic!("ledger touched")
        }
        fn buy_with_native(&mut self, _: Address, _: Address, _: Address, _: U256) -> Result<U256> {
            panic!("ledger touched")
        }
        fn sell_for_native(&mut self, _: Address, _: Address, _: Address, _: U256) -> Result<U256> {
            panic!("ledger touched")
        }
        fn add_liquidity(
            &mut self,
            _: Address,
            _: Address,
            _: Address,
            _: U256,
            _: U256,
            _: Address,
            _: U256,
        ) -> Result<crate::core::LiquidityReceipt> {
            panic!("ledger touched")
        }
        fn transfer(&mut self, _: Address, _: Address, _: Address, _: U256) -> Result<()> {
            panic!("ledger touched")
        }
    }

    #[test]
    fn test_out_of_range_tolerance_is_rejected_before_probing() {
        let runner = SimulationRunner::default();
        let too_big = ToleranceParameter::DENOMINATOR + 1;

        let err = runner
            .check_token(&mut UntouchableLedger, addr(1), addr(2), CheckKind::Tolerance, too_big)
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_malformed_addresses_are_rejected() {
        let runner = SimulationRunner::default();
        let cases = [
            (Address::zero(), addr(2)),
            (addr(1), Address::zero()),
            (addr(3), addr(3)),
        ];

        for (router, token) in cases {
            let err = runner
                .check_token(&mut UntouchableLedger, router, token, CheckKind::TransferFee, U256::zero())
                .unwrap_err();
            assert!(matches!(err, ScreenerError::InvalidAddress(_)));
        }
    }

    #[test]
    fn test_prober_and_recipient_must_differ() {
        let policy = ProbePolicy::default().with_recipient(ProbePolicy::DEFAULT_PROBER);
        let runner = SimulationRunner::new(policy);

        let err = runner
            .check_token(&mut UntouchableLedger, addr(1), addr(2), CheckKind::TransferFee, U256::zero())
            .unwrap_err();
        assert!(err.is_caller_error());
    }
}
