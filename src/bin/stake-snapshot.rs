use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stake_snapshot::{
    account::Account,
    api::HttpTransport,
    bin_utils::{
        OutputFormat, Service,
        logging::{LogFormat, init_logging},
    },
    config::Config,
    snapshot::StepError,
};
use tracing::warn;

/// Point-in-time balances, rewards, stake, unbonding, commission and vesting
/// of Cosmos SDK accounts.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long, env = "STAKE_SNAPSHOT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Default tracing directive, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format);

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load `{}`", args.config.display()))?;
    let transport =
        HttpTransport::new(config.http.timeout()).context("Failed to build HTTP client")?;

    let service = Service {
        config,
        transport,
        output: &mut std::io::stdout(),
        format: args.format,
        error_printer: Box::new(|chain: &str, account: &Account, err: &StepError| {
            warn!(chain, account = %account.name, "{err}")
        }),
    };
    service.run().map(|_| ())
}
