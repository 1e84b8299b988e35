//! idbridge - query a directory through the identity bridge
//!
//! Authenticates principals, looks up principals and groups, and pages
//! through principal searches against the configured LDAP or mock backend.

use std::path::PathBuf;

use clap::Parser;
use idbridge::IdentityBridge;
use idbridge_cli::backend::AnyBridge;
use idbridge_cli::commands::{self, Command};
use idbridge_cli::config::CliConfig;
use idbridge_cli::error::CliResult;
use idbridge_cli::logging::init_logging;

#[derive(Parser)]
#[command(name = "idbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, short, env = "IDBRIDGE_CONFIG", default_value = "idbridge.json")]
    config: PathBuf,

    /// Log filter, overriding the configured one
    #[arg(long, env = "IDBRIDGE_LOG")]
    log_filter: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(&cli.config)?;
    let filter = cli.log_filter.as_deref().unwrap_or(&config.log_filter);
    init_logging(filter, cli.log_json);

    let bridge = AnyBridge::build(config).await?;
    let mut stdout = std::io::stdout().lock();
    let result = commands::execute(&bridge, cli.command, &mut stdout).await;
    bridge.shutdown().await;
    result
}
