use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use clap::{Parser, ValueEnum};
use ethers::types::Address;
use serde::Serialize;
use tokio::task::JoinSet;
use honeypot_probe::blockchain::{chain_name, BlockchainClient};
use honeypot_probe::config::ScreenerConfig;
use honeypot_probe::{CheckKind, CheckReport, ExecutionMode, Result, ScreenerError, SimulationOutcome};

/// Screen ERC20 tokens for honeypot and fee-on-transfer behavior
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Token contract addresses to check
    #[arg(value_name = "TOKEN", required = true)]
    tokens: Vec<String>,

    /// UniswapV2-compatible router address
    #[arg(long, env = "ROUTER_ADDRESS")]
    router: Option<String>,

    /// RPC URL of the chain to fork
    #[arg(short, long, env = "RPC_URL")]
    rpc: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which checks to run
    #[arg(long, value_enum, default_value_t = CheckSelection::All)]
    check: CheckSelection,

    /// Acceptable round-trip loss as a fraction, e.g. 0.01
    #[arg(long)]
    tolerance: Option<String>,

    /// Native amount spent on the buy leg, in ether
    #[arg(long)]
    stake: Option<String>,

    /// Per-check timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep probe mutations on the fork instead of a discarded snapshot
    #[arg(long)]
    commit: bool,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckSelection {
    Tolerance,
    Fee,
    All,
}

impl CheckSelection {
    fn kinds(self) -> Vec<CheckKind> {
        match self {
            CheckSelection::Tolerance => vec![CheckKind::Tolerance],
            CheckSelection::Fee => vec![CheckKind::TransferFee],
            CheckSelection::All => vec![CheckKind::Tolerance, CheckKind::TransferFee],
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenSummary {
    token: Address,
    name: Option<String>,
    reports: Vec<CheckReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            tracing_subscriber::EnvFilter::new("honeypot_probe=debug")
        } else {
            tracing_subscriber::EnvFilter::new("honeypot_probe=info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::from(3)
        }
    }
}

/// Defaults, then the config file, then environment and flags
fn load_config(args: &Args) -> Result<ScreenerConfig> {
    let mut config = match &args.config {
        Some(path) => ScreenerConfig::from_file(path)?,
        None => ScreenerConfig::default(),
    };

    if let Some(rpc) = &args.rpc {
        config.rpc_url = Some(rpc.clone());
    }
    if let Some(router) = &args.router {
        config.router = Some(parse_address(router)?);
    }
    if let Some(tolerance) = &args.tolerance {
        config.probe.tolerance = tolerance.clone();
    }
    if let Some(stake) = &args.stake {
        config.probe.stake = stake.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.commit {
        config.mode = ExecutionMode::Commit;
    }

    Ok(config)
}

fn parse_address(value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|_| ScreenerError::InvalidAddress(value.to_string()))
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(&args)?;

    let rpc_url = config
        .rpc_url
        .clone()
        .ok_or_else(|| ScreenerError::ConfigError("no RPC URL (use --rpc or RPC_URL)".into()))?;
    let router = config
        .router
        .ok_or_else(|| ScreenerError::ConfigError("no router (use --router or ROUTER_ADDRESS)".into()))?;
    let tokens = args
        .tokens
        .iter()
        .map(|t| parse_address(t))
        .collect::<Result<Vec<_>>>()?;

    let tolerance = config.tolerance()?;
    let runner = config.runner()?;
    let kinds = args.check.kinds();

    let client = Arc::new(BlockchainClient::new(&rpc_url).await?);
    if !args.json {
        println!("Router: {:?}", router);
        println!("Chain:  {}\n", chain_name(client.chain_id()));
    }

    let mut tasks = JoinSet::new();
    for (index, token) in tokens.into_iter().enumerate() {
        let client = client.clone();
        let runner = runner.clone();
        let kinds = kinds.clone();

        tasks.spawn(async move {
            let name = match client.token_label(token).await {
                Ok(name) => Some(name),
                Err(e) => {
                    tracing::debug!("No name for {:?}: {}", token, e);
                    None
                }
            };

            let mut summary = TokenSummary {
                token,
                name,
                reports: Vec::new(),
                errors: Vec::new(),
            };
            for kind in kinds {
                match runner
                    .screen_on_chain(client.clone(), router, token, kind, tolerance.raw())
                    .await
                {
                    Ok(report) => summary.reports.push(report),
                    Err(e) => summary.errors.push(format!("{}: {}", kind, e)),
                }
            }
            (index, summary)
        });
    }

    let mut summaries = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => summaries.push(entry),
            Err(e) => return Err(ScreenerError::SimulationError(format!("screening task failed: {}", e))),
        }
    }
    summaries.sort_by_key(|(index, _)| *index);
    let summaries: Vec<TokenSummary> = summaries.into_iter().map(|(_, s)| s).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print_summary(summary, args.verbose);
        }
    }

    Ok(exit_code(&summaries))
}

fn print_summary(summary: &TokenSummary, verbose: bool) {
    match &summary.name {
        Some(name) => println!("Check token {:?} with name {}", summary.token, name),
        None => println!("Check token {:?}", summary.token),
    }

    for report in &summary.reports {
        match &report.outcome {
            SimulationOutcome::Indeterminate { reason } => {
                println!("INCONCLUSIVE {}: {}", report.check, reason)
            }
            outcome => println!("{} {}", outcome.label(), report.check),
        }
        if verbose {
            println!("{}", report);
        }
    }
    for error in &summary.errors {
        eprintln!("❌ {}", error);
    }
    println!();
}

fn exit_code(summaries: &[TokenSummary]) -> ExitCode {
    let reports = summaries.iter().flat_map(|s| s.reports.iter());
    let (mut failed, mut inconclusive) = (false, false);
    for report in reports {
        failed |= report.outcome.is_fail();
        inconclusive |= report.outcome.is_indeterminate();
    }

    if summaries.iter().any(|s| !s.errors.is_empty()) {
        ExitCode::from(3)
    } else if failed {
        ExitCode::from(1)
    } else if inconclusive {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
