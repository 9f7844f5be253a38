//! CLI command definitions
//!
//! Defines the clap commands for the blogcheck CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run built-in scenarios against the application
    Run {
        /// Scenario names (auth::login), suites (auth) or tags (smoke, ui, api, admin)
        selectors: Vec<String>,

        #[command(flatten)]
        target: TargetArgs,

        /// Scenarios to run at once, each on its own session
        #[arg(long, short, default_value_t = 1)]
        jobs: usize,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List built-in scenarios
    #[command(alias = "ls")]
    List {
        /// Only list scenarios matching these selectors
        selectors: Vec<String>,
    },

    /// Execute a scenario defined in a YAML file
    Scenario {
        /// Path to the YAML scenario file
        path: PathBuf,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the author email of a GitHub commit
    CommitEmail {
        /// Repository as owner/name
        repo: String,

        /// Commit SHA
        sha: String,
    },
}

/// Overrides for the application under test
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Base URL of the application (overrides APP_URL and the config file)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}
