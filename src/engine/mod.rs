//! Scenario execution core
//!
//! Leaf first: [`poller`] waits on remote state, [`session`] owns the remote
//! channel, [`runner`] sequences steps and classifies outcomes, [`report`]
//! turns run summaries into counts and an exit code.

pub mod poller;
pub mod report;
pub mod runner;
pub mod session;
pub mod step;

#[cfg(test)]
pub(crate) mod fake;

pub use poller::{poll, poll_for, Wait};
pub use report::{summarize, Report, SuiteReport};
pub use runner::{Scenario, ScenarioRunner};
pub use session::{with_session, Backend, Session};
pub use step::{Criticality, RunState, RunSummary, Step, StepOutcome, StepResult};
