//! blogcheck - end-to-end checks for the blogging application
//!
//! Drives the application through a browser (WebDriver) or plain HTTP,
//! runs scenarios step by step and exits non-zero when anything failed.

use blogcheck::commands::Commands;
use blogcheck::{cli, common::logging};
use clap::Parser;

#[derive(Parser)]
#[command(name = "blogcheck", about = "End-to-end checks for the blogging application")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write a detailed log to the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = logging::init_cli(cli.log_file);
    if guard.is_some() {
        if let Some(path) = logging::log_file_path() {
            tracing::info!(path = %path.display(), "Writing log file");
        }
    }

    let code = match cli::dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };

    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}
