//! Scenario execution
//!
//! Steps run strictly in order against one exclusively-owned session. Any
//! error a step raises is caught here and turned into a [`StepResult`]
//! according to the step's criticality; nothing but an acquisition failure
//! escapes a run.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use super::session::{Backend, Session};
use super::step::{Criticality, RunSummary, Step, StepOutcome, StepResult};
use crate::common::{Error, Result, SessionOptions};

/// A named, ordered list of steps
pub struct Scenario<B: Backend> {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub steps: Vec<Step<B>>,
}

impl<B: Backend> Scenario<B> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn step(mut self, step: Step<B>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step<B>>) -> Self {
        self.steps.extend(steps);
        self
    }
}

/// Executes steps and classifies their outcomes
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    /// Upper bound for a single step; exceeding it is a timeout failure
    step_timeout: Option<Duration>,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Run `steps` in order against `session`
    ///
    /// A Hard step failure halts the run: nothing is appended after it.
    pub async fn run<B: Backend>(
        &self,
        scenario: &str,
        session: &mut Session<B>,
        steps: &[Step<B>],
    ) -> RunSummary {
        let mut summary = RunSummary::new(scenario);
        summary.start();
        tracing::info!(scenario, session = %session.id(), steps = steps.len(), "Running scenario");

        for step in steps {
            if let Some(reason) = step.skip_reason() {
                tracing::info!(scenario, step = step.name(), reason, "Step skipped");
                summary.push(StepResult::new(
                    step.name(),
                    StepOutcome::Skipped,
                    None,
                    Duration::ZERO,
                ));
                continue;
            }

            let start = Instant::now();
            let result = match self.step_timeout {
                Some(limit) => match tokio::time::timeout(limit, invoke_caught(step, session)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout(
                        limit.as_millis() as u64,
                        Some(format!("step '{}' exceeded its time limit", step.name())),
                    )),
                },
                None => invoke_caught(step, session).await,
            };
            let elapsed = start.elapsed();

            match result {
                Ok(()) => {
                    tracing::info!(scenario, step = step.name(), elapsed_ms = elapsed.as_millis() as u64, "Step passed");
                    summary.push(StepResult::new(
                        step.name(),
                        StepOutcome::Passed,
                        None,
                        elapsed,
                    ));
                }
                Err(e) => match step.criticality() {
                    Criticality::Hard => {
                        tracing::error!(scenario, step = step.name(), kind = %e.kind(), error = %e, "Step failed");
                        let reason = e.to_string();
                        summary.push(StepResult::new(
                            step.name(),
                            StepOutcome::Failed(reason.clone()),
                            Some(e.kind()),
                            elapsed,
                        ));
                        summary.abort(format!("step '{}' failed: {}", step.name(), reason));
                        return summary;
                    }
                    Criticality::Soft => {
                        tracing::warn!(scenario, step = step.name(), kind = %e.kind(), error = %e, "Step warned");
                        summary.push(StepResult::new(
                            step.name(),
                            StepOutcome::Warned(e.to_string()),
                            Some(e.kind()),
                            elapsed,
                        ));
                    }
                },
            }
        }

        summary.complete();
        summary
    }

    /// Acquire a session, run the scenario, release the session
    ///
    /// An acquisition failure yields an Aborted summary with no entries.
    pub async fn execute<B: Backend>(
        &self,
        scenario: &Scenario<B>,
        options: &SessionOptions,
    ) -> RunSummary {
        let mut session = match Session::<B>::acquire(options).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(scenario = %scenario.name, error = %e, "Session acquisition failed");
                let mut summary = RunSummary::new(&scenario.name);
                summary.abort(e.to_string());
                return summary;
            }
        };

        let summary = self.run(&scenario.name, &mut session, &scenario.steps).await;
        session.release().await;
        summary
    }
}

/// Invoke a step, turning a panic inside its action into an internal error
async fn invoke_caught<B: Backend>(step: &Step<B>, session: &mut Session<B>) -> Result<()> {
    match AssertUnwindSafe(step.invoke(session)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::Internal(format!(
            "step '{}' panicked: {}",
            step.name(),
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{closes, FakeBackend};
    use crate::engine::step::RunState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok_step(name: &str, criticality: Criticality) -> Step<FakeBackend> {
        let label = name.to_string();
        Step::<FakeBackend>::new(name, criticality, move |session| {
            let label = label.clone();
            Box::pin(async move {
                session.backend()?.actions.push(label);
                Ok(())
            })
        })
    }

    fn failing_step(name: &str, criticality: Criticality) -> Step<FakeBackend> {
        Step::<FakeBackend>::new(name, criticality, |_session| {
            Box::pin(async { Err(Error::assertion("still on sign-up page")) })
        })
    }

    fn counting_step(name: &str, calls: Arc<AtomicUsize>) -> Step<FakeBackend> {
        Step::<FakeBackend>::hard(name, move |_session| {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        })
    }

    async fn session(base_url: &str) -> Session<FakeBackend> {
        Session::acquire(&SessionOptions::new(base_url)).await.unwrap()
    }

    #[tokio::test]
    async fn test_hard_failure_halts_run() {
        let later = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            failing_step("register", Criticality::Hard),
            counting_step("login", later.clone()),
            counting_step("createPost", later.clone()),
            counting_step("deletePost", later.clone()),
        ];

        let mut session = session("http://fake/hard-halt").await;
        let summary = ScenarioRunner::new().run("blog", &mut session, &steps).await;
        session.release().await;

        assert_eq!(summary.entries().len(), 1);
        assert!(matches!(summary.entries()[0].outcome(), StepOutcome::Failed(_)));
        assert_eq!(summary.state(), RunState::Aborted);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_soft_failure_continues() {
        let steps = vec![
            ok_step("register", Criticality::Hard),
            ok_step("login", Criticality::Hard),
            failing_step("createPost", Criticality::Soft),
            ok_step("view", Criticality::Soft),
        ];

        let mut session = session("http://fake/soft-continue").await;
        let summary = ScenarioRunner::new().run("blog", &mut session, &steps).await;

        let outcomes: Vec<_> = summary.entries().iter().map(|e| e.outcome().clone()).collect();
        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Passed,
                StepOutcome::Passed,
                StepOutcome::Warned("Assertion failed: still on sign-up page".into()),
                StepOutcome::Passed,
            ]
        );
        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(
            session.backend().unwrap().actions,
            vec!["register", "login", "view"]
        );
        session.release().await;
    }

    #[tokio::test]
    async fn test_skipped_step_is_recorded_not_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let steps = vec![
            ok_step("login", Criticality::Hard),
            counting_step("admin", calls.clone()).skip_if(true, "SKIP_ADMIN_TESTS"),
        ];

        let mut session = session("http://fake/skip").await;
        let summary = ScenarioRunner::new().run("admin", &mut session, &steps).await;
        session.release().await;

        assert_eq!(summary.entries()[1].outcome(), &StepOutcome::Skipped);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_step_timeout_is_classified() {
        let steps: Vec<Step<FakeBackend>> = vec![Step::<FakeBackend>::soft("slow", |_session| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
        })];

        let mut session = session("http://fake/step-timeout").await;
        let summary = ScenarioRunner::new()
            .with_step_timeout(Duration::from_millis(20))
            .run("slow", &mut session, &steps)
            .await;
        session.release().await;

        assert!(matches!(summary.entries()[0].outcome(), StepOutcome::Warned(_)));
        assert_eq!(summary.entries()[0].kind(), Some(crate::common::ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_execute_releases_once_even_on_failure() {
        let scenario = Scenario::new("fails")
            .step(ok_step("open", Criticality::Hard))
            .step(failing_step("assert", Criticality::Hard));

        let summary = ScenarioRunner::new()
            .execute(&scenario, &SessionOptions::new("http://fake/execute-release"))
            .await;

        assert_eq!(summary.failed(), 1);
        assert_eq!(closes("http://fake/execute-release"), 1);
    }

    #[tokio::test]
    async fn test_execute_acquisition_failure_aborts() {
        let scenario = Scenario::new("unreachable").step(ok_step("open", Criticality::Hard));

        let summary = ScenarioRunner::new()
            .execute(&scenario, &SessionOptions::new("http://fake/refuse-open"))
            .await;

        assert_eq!(summary.state(), RunState::Aborted);
        assert!(summary.entries().is_empty());
        assert!(summary.abort_reason().unwrap().contains("connection refused"));
    }

    fn panicking_step(name: &str, criticality: Criticality) -> Step<FakeBackend> {
        Step::<FakeBackend>::new(name, criticality, |_session| {
            Box::pin(async {
                let posts: Vec<&str> = Vec::new();
                if posts[0].is_empty() {
                    return Err(Error::assertion("empty title"));
                }
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn test_soft_panic_is_warned_and_run_continues() {
        let scenario = Scenario::new("panics")
            .step(ok_step("open", Criticality::Hard))
            .step(panicking_step("read first post", Criticality::Soft))
            .step(ok_step("view", Criticality::Soft));

        let summary = ScenarioRunner::new()
            .execute(&scenario, &SessionOptions::new("http://fake/soft-panic"))
            .await;

        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(summary.entries().len(), 3);
        let entry = &summary.entries()[1];
        assert!(matches!(entry.outcome(), StepOutcome::Warned(r) if r.contains("panicked")));
        assert_eq!(entry.kind(), Some(crate::common::ErrorKind::Other));
        assert_eq!(closes("http://fake/soft-panic"), 1);
    }

    #[tokio::test]
    async fn test_hard_panic_aborts_and_releases() {
        let scenario = Scenario::new("panics")
            .step(panicking_step("read first post", Criticality::Hard))
            .step(ok_step("never", Criticality::Hard));

        let summary = ScenarioRunner::new()
            .with_step_timeout(Duration::from_secs(5))
            .execute(&scenario, &SessionOptions::new("http://fake/hard-panic"))
            .await;

        assert_eq!(summary.state(), RunState::Aborted);
        assert_eq!(summary.entries().len(), 1);
        assert!(matches!(summary.entries()[0].outcome(), StepOutcome::Failed(_)));
        assert_eq!(closes("http://fake/hard-panic"), 1);
    }

    #[tokio::test]
    async fn test_steps_share_session_vars() {
        let scenario: Scenario<FakeBackend> = Scenario::new("vars")
            .step(Step::<FakeBackend>::hard("login", |session| {
                Box::pin(async move {
                    session.set_var("token", "t-123");
                    Ok(())
                })
            }))
            .step(Step::<FakeBackend>::hard("use token", |session| {
                Box::pin(async move {
                    let token: Result<String> = session.require_var("token");
                    assert_eq!(token?, "t-123");
                    Ok(())
                })
            }));

        let summary = ScenarioRunner::new()
            .execute(&scenario, &SessionOptions::new("http://fake/vars"))
            .await;
        assert_eq!(summary.passed(), 2);
    }
}
