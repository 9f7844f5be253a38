//! CLI command handling
//!
//! Dispatches CLI commands to the engine and formats output.

use std::time::Duration;

use colored::Colorize;
use futures_util::stream::{self, StreamExt};

use crate::commands::{Commands, TargetArgs};
use crate::common::{Config, Error, Result, SessionOptions};
use crate::engine::report::{print_run, print_summary};
use crate::engine::{summarize, ScenarioRunner, SuiteReport};
use crate::{github, suites, testing};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            selectors,
            target,
            jobs,
            json,
        } => {
            let config = Config::load()?;
            let options = session_options(&config, &target);
            options.validate()?;
            if jobs == 0 {
                return Err(Error::Config("--jobs must be at least 1".to_string()));
            }

            let plans = suites::select(suites::catalog(&config), &selectors)?;
            let runner = runner(&config);
            tracing::info!(scenarios = plans.len(), jobs, base_url = %options.base_url, "Starting run");

            let runs = stream::iter(plans.iter())
                .map(|plan| plan.execute(&runner, &options))
                .buffered(jobs)
                .collect::<Vec<_>>()
                .await;

            let report = SuiteReport::new(runs);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(report.exit_code())
        }

        Commands::List { selectors } => {
            let config = Config::load()?;
            let plans = suites::select(suites::catalog(&config), &selectors)?;

            println!("{}", "Scenarios:".cyan().bold());
            for plan in &plans {
                println!(
                    "  {:<24} {:<8} {:>2} steps  {}",
                    plan.name().white().bold(),
                    plan.backend(),
                    plan.step_count(),
                    format!("[{}]", plan.tags().join(", ")).dimmed()
                );
                if let Some(desc) = plan.description() {
                    println!("  {:<24} {}", "", desc.dimmed());
                }
            }
            println!("\n{} scenario(s)", plans.len());
            Ok(0)
        }

        Commands::Scenario {
            path,
            verbose,
            target,
        } => {
            let config = Config::load()?;
            let options = session_options(&config, &target);
            let summary =
                testing::run_scenario(&path, &runner(&config), &options, verbose).await?;

            print_run(&summary);
            let report = summarize(&summary);
            if report.exit_code == 0 {
                println!("\n{} {}", "PASSED".green().bold(), summary.scenario());
            } else {
                println!("\n{} {}", "FAILED".red().bold(), summary.scenario());
            }
            Ok(report.exit_code)
        }

        Commands::CommitEmail { repo, sha } => {
            let email = github::commit_email(&github::api_url(), &repo, &sha).await?;
            println!("{}", email);
            Ok(0)
        }
    }
}

/// Session options from the config with command-line overrides applied
fn session_options(config: &Config, target: &TargetArgs) -> SessionOptions {
    let mut options = config.session_options();
    if let Some(url) = &target.base_url {
        options.base_url = url.clone();
    }
    if target.headed {
        options.headless = false;
    }
    options
}

fn runner(config: &Config) -> ScenarioRunner {
    ScenarioRunner::new().with_step_timeout(Duration::from_secs(config.timeouts.step_secs))
}
