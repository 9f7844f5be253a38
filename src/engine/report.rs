//! Outcome reporting
//!
//! Exit code policy: 0 only when no step Failed and no run Aborted.
//! Warned steps never change the exit code.

use colored::Colorize;
use serde::Serialize;

use super::step::{RunState, RunSummary, StepOutcome};

/// Counts for one run (or many, see [`SuiteReport`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
    pub skipped: usize,
    pub exit_code: i32,
}

/// Summarize a single run
pub fn summarize(summary: &RunSummary) -> Report {
    let failed = summary.failed();
    let aborted = summary.state() == RunState::Aborted;
    Report {
        passed: summary.passed(),
        failed,
        warned: summary.warned(),
        skipped: summary.skipped(),
        exit_code: if failed == 0 && !aborted { 0 } else { 1 },
    }
}

/// Aggregate of several independent runs
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub totals: Report,
    pub runs: Vec<RunSummary>,
}

impl SuiteReport {
    pub fn new(runs: Vec<RunSummary>) -> Self {
        let totals = runs.iter().map(summarize).fold(Report::default(), |acc, r| Report {
            passed: acc.passed + r.passed,
            failed: acc.failed + r.failed,
            warned: acc.warned + r.warned,
            skipped: acc.skipped + r.skipped,
            exit_code: acc.exit_code.max(r.exit_code),
        });
        Self { totals, runs }
    }

    pub fn exit_code(&self) -> i32 {
        self.totals.exit_code
    }

    /// Number of runs that ended Aborted
    pub fn aborted(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.state() == RunState::Aborted)
            .count()
    }
}

/// Print one run's step outcomes
pub fn print_run(summary: &RunSummary) {
    println!(
        "\n{} {}",
        "Scenario:".blue().bold(),
        summary.scenario().white().bold()
    );

    for (i, entry) in summary.entries().iter().enumerate() {
        let n = i + 1;
        let timing = format!("({} ms)", entry.duration_ms()).dimmed();
        match entry.outcome() {
            StepOutcome::Passed => {
                println!("  {} Step {}: {} {}", "✓".green(), n, entry.name(), timing)
            }
            StepOutcome::Failed(reason) => {
                println!("  {} Step {}: {} {}", "✗".red(), n, entry.name(), timing);
                println!("      {}", reason.red());
            }
            StepOutcome::Warned(reason) => {
                println!("  {} Step {}: {} {}", "!".yellow(), n, entry.name(), timing);
                println!("      {}", reason.dimmed());
            }
            StepOutcome::Skipped => {
                println!("  {} Step {}: {} {}", "-".dimmed(), n, entry.name(), "(skipped)".dimmed())
            }
        }
    }

    if let Some(reason) = summary.abort_reason() {
        println!("  {} {}", "Aborted:".red().bold(), reason);
    }
}

/// Print every run followed by the totals line
pub fn print_summary(report: &SuiteReport) {
    for run in &report.runs {
        print_run(run);
    }

    let t = &report.totals;
    let verdict = if t.exit_code == 0 {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!(
        "\n{} {} scenario(s): {} passed, {} failed, {} warned, {} skipped, {} aborted\n",
        verdict,
        report.runs.len(),
        t.passed,
        t.failed,
        t.warned,
        t.skipped,
        report.aborted()
    );
}
