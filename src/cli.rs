//! CLI argument parsing using clap v4

use clap::{Parser, Subcommand};

/// executor-state - single-slot async execution state machine
///
/// Runs demonstration scenarios of the executor lifecycle and manages the
/// configuration file.
#[derive(Parser, Debug)]
#[command(name = "executor-state")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run demonstration scenarios and print every observed state change
    Demo {
        /// Scenario to run: sync-resolve, async-resolve, supersede, abort, clear, dispose (default: all)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Simulated latency of deferred work in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,

        /// Path to configuration file
        #[arg(short, long, env = "EXECUTOR_STATE_CONFIG")]
        config: Option<String>,
    },

    /// Display version information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
