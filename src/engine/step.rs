//! Steps and their recorded outcomes

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;

use super::session::{Backend, Session};
use crate::common::{ErrorKind, Result};

/// What a failing step does to the rest of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Failure is recorded as Failed and halts the run
    Hard,
    /// Failure is recorded as Warned and the run continues
    Soft,
}

type Action<B> =
    Box<dyn for<'a> Fn(&'a mut Session<B>) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// A named unit of scripted interaction
pub struct Step<B: Backend> {
    name: String,
    criticality: Criticality,
    action: Action<B>,
    skip: Option<String>,
}

impl<B: Backend> Step<B> {
    pub fn new<F>(name: impl Into<String>, criticality: Criticality, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<B>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            criticality,
            action: Box::new(action),
            skip: None,
        }
    }

    /// A step whose failure halts the run
    pub fn hard<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<B>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        Self::new(name, Criticality::Hard, action)
    }

    /// A step whose failure only warns
    pub fn soft<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a mut Session<B>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
    {
        Self::new(name, Criticality::Soft, action)
    }

    /// Record the step as Skipped instead of running it when `condition` holds
    pub fn skip_if(mut self, condition: bool, reason: impl Into<String>) -> Self {
        if condition {
            self.skip = Some(reason.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_deref()
    }

    pub(crate) fn invoke<'a>(&self, session: &'a mut Session<B>) -> BoxFuture<'a, Result<()>> {
        (self.action)(session)
    }
}

impl<B: Backend> std::fmt::Debug for Step<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("criticality", &self.criticality)
            .field("skip", &self.skip)
            .finish()
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed(String),
    Warned(String),
    Skipped,
}

impl StepOutcome {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed(r) | Self::Warned(r) => Some(r),
            Self::Passed | Self::Skipped => None,
        }
    }
}

/// Immutable record of a step's execution
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    name: String,
    outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ErrorKind>,
    duration_ms: u64,
}

impl StepResult {
    pub(crate) fn new(
        name: impl Into<String>,
        outcome: StepOutcome,
        kind: Option<ErrorKind>,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            outcome,
            kind,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outcome(&self) -> &StepOutcome {
        &self.outcome
    }

    /// Error classification for Failed and Warned outcomes
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Run lifecycle: `NotStarted -> Running -> {Completed, Aborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Ordered record of a scenario run
///
/// Entries can only be appended while the run is `Running`; once finished
/// or aborted the summary is read-only.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    scenario: String,
    state: RunState,
    entries: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    abort_reason: Option<String>,
}

impl RunSummary {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            state: RunState::NotStarted,
            entries: Vec::new(),
            abort_reason: None,
        }
    }

    pub(crate) fn start(&mut self) {
        if self.state == RunState::NotStarted {
            self.state = RunState::Running;
        }
    }

    /// Append a result. Ignored (and logged) unless the run is `Running`.
    pub(crate) fn push(&mut self, result: StepResult) {
        if self.state != RunState::Running {
            tracing::warn!(
                scenario = %self.scenario,
                step = %result.name,
                state = %self.state,
                "Ignoring step result for a run that is not running"
            );
            return;
        }
        self.entries.push(result);
    }

    pub(crate) fn complete(&mut self) {
        if matches!(self.state, RunState::NotStarted | RunState::Running) {
            self.state = RunState::Completed;
        }
    }

    pub(crate) fn abort(&mut self, reason: impl Into<String>) {
        if matches!(self.state, RunState::NotStarted | RunState::Running) {
            self.state = RunState::Aborted;
            self.abort_reason = Some(reason.into());
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn entries(&self) -> &[StepResult] {
        &self.entries
    }

    pub fn abort_reason(&self) -> Option<&str> {
        self.abort_reason.as_deref()
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Failed(_)))
    }

    pub fn warned(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Warned(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(name: &str) -> StepResult {
        StepResult::new(name, StepOutcome::Passed, None, Duration::from_millis(3))
    }

    #[test]
    fn test_summary_lifecycle() {
        let mut summary = RunSummary::new("auth::login");
        assert_eq!(summary.state(), RunState::NotStarted);

        summary.start();
        summary.push(passed("register"));
        summary.push(StepResult::new(
            "logout",
            StepOutcome::Warned("no sign out button".into()),
            Some(ErrorKind::Timeout),
            Duration::ZERO,
        ));
        summary.complete();

        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(summary.entries().len(), 2);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.warned(), 1);
        assert_eq!(summary.entries()[1].kind(), Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_finished_summary_is_read_only() {
        let mut summary = RunSummary::new("posts::create");
        summary.start();
        summary.push(passed("register"));
        summary.complete();

        summary.push(passed("late"));
        summary.abort("too late");

        assert_eq!(summary.entries().len(), 1);
        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(summary.abort_reason(), None);
    }

    #[test]
    fn test_push_before_start_is_ignored() {
        let mut summary = RunSummary::new("early");
        summary.push(passed("too early"));
        assert!(summary.entries().is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_reason() {
        let json = serde_json::to_value(StepOutcome::Failed("HTTP 500".into())).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 500");

        let json = serde_json::to_value(StepOutcome::Passed).unwrap();
        assert_eq!(json["status"], "passed");
    }
}
