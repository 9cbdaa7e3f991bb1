//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenario files against the node
    Run {
        /// YAML scenario files, run in the given order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print every step and the final session contents
        #[arg(long, short)]
        verbose: bool,

        #[command(flatten)]
        node: NodeArgs,
    },

    /// Show the groups and cases of scenario files without running them
    List {
        /// YAML scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        #[command(flatten)]
        node: NodeArgs,
    },
}

/// Overrides for the `[node]` and `[transcript]` configuration sections
#[derive(Args, Debug, Default, Clone)]
pub struct NodeArgs {
    /// Client executable name or path
    #[arg(long)]
    pub client: Option<String>,

    /// Client base directory
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Node RPC endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Write a regression transcript to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Keep run-variable values (hashes, timestamps) in the transcript
    #[arg(long)]
    pub no_scrub: bool,
}
