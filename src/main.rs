//! executor-state CLI
//!
//! Runs the built-in executor scenarios and manages configuration.

mod cli;

use std::time::Duration;

use clap::Parser;
use tracing::info;

use executor_state::config::{self, Settings};
use executor_state::demo::{self, Scenario};
use executor_state::error::{Error, Result};
use executor_state::logging;

use crate::cli::{Cli, Commands, ConfigSubcommand};

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Demo {
            scenario,
            delay_ms,
            config,
        } => {
            let settings = Settings::load(config.as_deref())?;
            let _log_guards = logging::init_logging(&settings.logging, cli.verbose, cli.quiet)?;

            let scenario = scenario.as_deref().map(str::parse::<Scenario>).transpose()?;
            let delay = Duration::from_millis(delay_ms.unwrap_or(settings.demo.delay_ms));

            run_demo(scenario, delay)
        }
    }
}

fn run_demo(scenario: Option<Scenario>, delay: Duration) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(format!("Failed to create runtime: {}", e)))?;

    info!(scenario = ?scenario, delay_ms = delay.as_millis() as u64, "Running demo");

    let reports = runtime.block_on(async {
        match scenario {
            Some(scenario) => demo::run_scenario(scenario, delay).await.map(|r| vec![r]),
            None => demo::run_all(delay).await,
        }
    })?;

    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let settings = Settings::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&settings)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let created = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", created.display());
        }
        ConfigSubcommand::Validate { config } => {
            Settings::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
