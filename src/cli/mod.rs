//! CLI command handling
//!
//! Builds the command client from configuration, loads scenarios and hands
//! them to the controller.

use std::path::Path;

use colored::Colorize;

use crate::client::{Backend, CommandClient, ProcessBackend, TranscriptBackend};
use crate::commands::{Commands, NodeArgs};
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::harness::{collect_groups, report, Controller, RunReport};
use crate::scenario::{load_scenarios, RunSettings};

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; a run with failed or blocked
/// cases is not a success.
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<bool> {
    match command {
        Commands::Run {
            paths,
            verbose,
            node,
        } => {
            let config = load_config(config_path, &node)?;
            let settings = RunSettings {
                defaults: config.defaults.clone(),
                verbose,
            };

            let scenarios = load_scenarios(&paths, &settings)?;
            let client = build_client(&config)?;
            let controller = Controller::new(client);

            let mut summary = RunReport::default();
            for scenario in scenarios {
                println!(
                    "\n{} {}",
                    "Running Scenario:".blue().bold(),
                    scenario.name.white().bold()
                );
                if let Some(desc) = &scenario.description {
                    println!("  {}", desc.dimmed());
                }

                let groups = collect_groups(scenario.cases);
                let run = controller.run(&groups).await?;
                for group in &run.groups {
                    report::print_group(group, verbose);
                }
                summary.extend(run);
            }

            report::print_summary(&summary);
            Ok(summary.success())
        }

        Commands::List { paths } => {
            let scenarios = load_scenarios(&paths, &RunSettings::default())?;
            for scenario in scenarios {
                println!(
                    "{} {}",
                    scenario.name.white().bold(),
                    format!("({})", scenario.path.display()).dimmed()
                );
                for group in collect_groups(scenario.cases) {
                    if group.incremental {
                        println!("  {} {}", "group".cyan(), group.id);
                        for case in group.cases() {
                            println!("    {}", case.meta().name);
                        }
                    } else {
                        println!("  {}", group.id);
                    }
                }
            }
            Ok(true)
        }

        Commands::Config { node } => {
            let config = load_config(config_path, &node)?;

            match config_path.map(Path::to_path_buf).or_else(paths::config_path) {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("Config file: (no config directory)"),
            }
            match config.resolve_client() {
                Ok(path) => println!("Client: {}", path.display()),
                Err(e) => println!("Client: {} ({})", config.node.client, e.to_string().red()),
            }
            println!("Endpoint: {}", config.node.endpoint);
            if let Some(dir) = &config.node.base_dir {
                println!("Base dir: {}", dir.display());
            }
            if !config.node.extra_args.is_empty() {
                println!("Extra args: {}", config.node.extra_args.join(" "));
            }
            println!(
                "Bake: --max-priority {}{}",
                config.defaults.bake_max_priority,
                if config.defaults.bake_minimal_timestamp {
                    " --minimal-timestamp"
                } else {
                    ""
                }
            );
            if let Some(cap) = config.defaults.burn_cap {
                println!("Burn cap: {}", cap);
            }
            if let Some(path) = &config.transcript.path {
                println!(
                    "Transcript: {}{}",
                    path.display(),
                    if config.transcript.scrub { "" } else { " (unscrubbed)" }
                );
            }
            Ok(true)
        }
    }
}

/// Load configuration and apply command line overrides
fn load_config(path: Option<&Path>, node: &NodeArgs) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(client) = &node.client {
        config.node.client = client.clone();
    }
    if let Some(dir) = &node.base_dir {
        config.node.base_dir = Some(dir.clone());
    }
    if let Some(endpoint) = &node.endpoint {
        config.node.endpoint = endpoint.clone();
    }
    if let Some(transcript) = &node.transcript {
        config.transcript.path = Some(transcript.clone());
    }
    if node.no_scrub {
        config.transcript.scrub = false;
    }
    Ok(config)
}

fn build_client(config: &Config) -> Result<CommandClient> {
    let program = config.resolve_client()?;
    tracing::info!(client = %program.display(), endpoint = %config.node.endpoint, "using node client");

    let mut process = ProcessBackend::new(program).endpoint(config.node.endpoint.clone());
    if let Some(dir) = &config.node.base_dir {
        process = process.base_dir(dir.clone());
    }
    process = process.extra_args(config.node.extra_args.clone());

    let backend: Box<dyn Backend> = match &config.transcript.path {
        Some(path) => Box::new(TranscriptBackend::create(
            Box::new(process),
            path,
            config.transcript.scrub,
        )?),
        None => Box::new(process),
    };
    Ok(CommandClient::new(backend))
}
