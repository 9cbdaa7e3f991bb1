//! chain-harness - incremental end-to-end tests for blockchain node clients
//!
//! Runs YAML scenarios against a node through its command line client.

use std::path::PathBuf;

use chain_harness::commands::Commands;
use chain_harness::{cli, common::logging};
use clap::Parser;

#[derive(Parser)]
#[command(name = "chain-harness", about = "Incremental end-to-end tests for node clients")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/chain-harness/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    logging::init_cli(verbose);

    match cli::dispatch(cli.command, cli.config.as_deref()).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
