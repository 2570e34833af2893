use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use clap::Parser as ClapParser;
use erc20gas_bench::{
    FailurePolicy, Harness, Registry, ReportOptions, Reporter, artifacts::HardhatArtifacts,
};
use erc20gas_rpc::{
    EthClient,
    clients::eth::{RECEIPT_MAX_ATTEMPTS, RECEIPT_POLL_INTERVAL},
};
use eyre::WrapErr;
use tracing::{Level, info};
use url::Url;

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[derive(ClapParser)]
#[command(
    name = "erc20gas",
    version = VERSION_STRING,
    about = "Compare the gas cost of credit, transfer and drain across ERC20 implementations"
)]
pub struct Options {
    #[arg(
        long = "rpc-url",
        env = "ERC20GAS_RPC_URL",
        default_value = "http://localhost:8545",
        value_delimiter = ',',
        value_name = "URL",
        help = "JSON-RPC endpoints of a dev node with unlocked accounts, tried in order"
    )]
    pub rpc_url: Vec<Url>,
    #[arg(
        long,
        env = "ERC20GAS_ARTIFACTS",
        default_value = "artifacts",
        value_name = "DIR",
        help = "Hardhat artifacts directory holding the compiled token contracts"
    )]
    pub artifacts: PathBuf,
    #[arg(
        long,
        value_delimiter = ',',
        value_name = "NAMES",
        help = "Comma-separated subset of variants to run (default: all)"
    )]
    pub variants: Vec<String>,
    #[arg(long = "no-credit", help = "Leave the credit columns out of the table")]
    pub no_credit: bool,
    #[arg(
        long,
        default_value_t = FailurePolicy::Placeholder,
        value_name = "POLICY",
        help = "How failed cases show up in the table: omit | placeholder"
    )]
    pub failures: FailurePolicy,
    #[arg(
        long = "receipt-poll-interval-ms",
        default_value_t = RECEIPT_POLL_INTERVAL.as_millis() as u64,
        value_name = "MILLISECONDS",
        help_heading = "Receipt options"
    )]
    pub receipt_poll_interval_ms: u64,
    #[arg(
        long = "receipt-max-attempts",
        default_value_t = RECEIPT_MAX_ATTEMPTS,
        value_name = "ATTEMPTS",
        help_heading = "Receipt options"
    )]
    pub receipt_max_attempts: u64,
    #[arg(long, value_name = "PATH", help = "Write every measurement and failure as JSON")]
    pub output: Option<PathBuf>,
    #[arg(long = "log.level", default_value_t = Level::INFO, value_name = "LOG_LEVEL")]
    pub log_level: Level,
}

pub async fn run(opts: Options) -> eyre::Result<()> {
    let rpc_urls: Vec<&str> = opts.rpc_url.iter().map(Url::as_str).collect();
    let endpoints = rpc_urls.join(", ");
    let client = EthClient::new_with_config(
        rpc_urls,
        Duration::from_millis(opts.receipt_poll_interval_ms),
        opts.receipt_max_attempts,
    )?;
    let block = client
        .get_block_number()
        .await
        .wrap_err_with(|| format!("could not reach {endpoints}"))?;
    info!(rpc_url = %endpoints, %block, "Connected to node");

    let mut registry = Registry::standard()?;
    if !opts.variants.is_empty() {
        registry.retain_named(&opts.variants)?;
    }

    let artifacts = HardhatArtifacts::new(&opts.artifacts);
    let mut reporter = Reporter::new(ReportOptions {
        include_credit: !opts.no_credit,
        failures: opts.failures,
    });

    Harness::new(&client, &artifacts)
        .run(&registry, &mut reporter)
        .await?;

    write_report(&reporter, &mut io::stdout().lock(), &mut io::stderr().lock())
        .wrap_err("failed to write the report")?;

    if let Some(path) = opts.output {
        fs::write(&path, reporter.to_json()?)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        info!("Results written to {}", path.display());
    }

    Ok(())
}

/// Table on `out`, then one line per failed case on `err`.
fn write_report(reporter: &Reporter, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    write!(out, "{}", reporter.render())?;
    out.flush()?;
    for line in reporter.failure_lines() {
        writeln!(err, "{line}")?;
    }
    Ok(())
}
