//! Declarative scenario execution
//!
//! A YAML file is loaded and checked completely before any session is
//! acquired, then compiled into ordinary [`Step`]s and handed to the
//! [`ScenarioRunner`].

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use reqwest::Method;

use super::config::{BackendKind, Request, StepAction, TestScenario, TestStep};
use crate::common::{Error, Result, SessionOptions};
use crate::driver::{BrowserSession, HttpSession, Locator};
use crate::engine::{poll, Criticality, RunSummary, Scenario, ScenarioRunner, Session, Step};

/// Read and parse a scenario file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse scenario '{}': {}", path.display(), e)))
}

/// Reject scenarios that could only fail after a session was acquired
pub fn validate(scenario: &TestScenario) -> Result<()> {
    if scenario.steps.is_empty() {
        return Err(Error::Config(format!("scenario '{}' has no steps", scenario.name)));
    }
    for (i, step) in scenario.steps.iter().enumerate() {
        let needs = step.action.backend();
        if needs != scenario.backend {
            return Err(Error::Config(format!(
                "step {} ({}) needs a {} session but the scenario uses {}",
                i + 1,
                step.action.describe(),
                needs,
                scenario.backend
            )));
        }
        if let StepAction::Request(request) = &step.action {
            parse_method(&request.method)?;
        }
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| Error::Config(format!("invalid HTTP method '{}'", method)))
}

fn step_name(index: usize, step: &TestStep) -> String {
    step.name
        .clone()
        .unwrap_or_else(|| format!("{}. {}", index + 1, step.action.describe()))
}

fn criticality(step: &TestStep) -> Criticality {
    if step.critical {
        Criticality::Hard
    } else {
        Criticality::Soft
    }
}

fn browser_step(index: usize, step: &TestStep) -> Step<BrowserSession> {
    let action = step.action.clone();
    Step::<BrowserSession>::new(step_name(index, step), criticality(step), move |s| {
        let action = action.clone();
        Box::pin(async move { browser_action(s, &action).await })
    })
}

fn http_step(index: usize, step: &TestStep) -> Step<HttpSession> {
    let action = step.action.clone();
    Step::<HttpSession>::new(step_name(index, step), criticality(step), move |s| {
        let action = action.clone();
        Box::pin(async move { http_action(s, &action).await })
    })
}

async fn browser_action(s: &mut Session<BrowserSession>, action: &StepAction) -> Result<()> {
    let target = match action {
        StepAction::Navigate(a) => Some(s.url(&a.path)),
        _ => None,
    };
    let browser = &*s.backend()?;
    let wait = browser.wait();

    match action {
        StepAction::Navigate(_) => {
            if let Some(url) = target {
                browser.goto(&url).await?;
            }
        }
        StepAction::WaitFor(a) => {
            let wait = match a.timeout_ms {
                Some(ms) => wait.with_timeout(Duration::from_millis(ms)),
                None => wait,
            };
            browser.wait_for(&a.locator, wait).await?;
        }
        StepAction::Fill(a) => browser.fill(&a.locator, &a.text).await?,
        StepAction::Click(a) => browser.click(&a.locator).await?,
        StepAction::ExpectUrl(a) => {
            browser
                .wait_for_url(|url| url.contains(&a.contains), wait)
                .await?;
        }
        StepAction::ExpectText(a) => {
            let body = Locator::tag("body");
            let locator = a.locator.as_ref().unwrap_or(&body);
            let contains = a.contains.as_str();
            poll(
                || async move { Ok(browser.text(locator).await?.contains(contains)) },
                wait,
            )
            .await
            .map_err(|e| match e {
                Error::Timeout { waited_ms, .. } => Error::timeout(
                    waited_ms,
                    Some(format!("{} never contained '{}'", locator, contains)),
                ),
                other => other,
            })?;
        }
        StepAction::ExpectCount(a) => {
            let locator = &a.locator;
            let min = a.min;
            poll(
                || async move { Ok(browser.count(locator).await? >= min) },
                wait,
            )
            .await?;
        }
        StepAction::Request(_) => {
            return Err(Error::Internal(
                "request step compiled for a browser session".to_string(),
            ))
        }
    }
    Ok(())
}

async fn http_action(s: &mut Session<HttpSession>, action: &StepAction) -> Result<()> {
    let StepAction::Request(request) = action else {
        return Err(Error::Internal(format!(
            "{} compiled for an HTTP session",
            action.describe()
        )));
    };
    send_request(&*s.backend()?, request).await
}

async fn send_request(http: &HttpSession, request: &Request) -> Result<()> {
    let method = parse_method(&request.method)?;
    let response = http
        .request(method, &http.url(&request.path), request.body.as_ref())
        .await?;

    match &request.expect_status {
        Some(allowed) => {
            response.expect_status(allowed)?;
        }
        None if !(200..300).contains(&response.status) => {
            return Err(Error::assertion(format!(
                "{} {} returned {}",
                response.method, response.url, response.status
            )));
        }
        None => {}
    }

    if let Some(needle) = &request.body_contains {
        if !response.body.contains(needle.as_str()) {
            return Err(Error::assertion(format!(
                "{} {} body does not contain '{}'",
                response.method, response.url, needle
            )));
        }
    }
    Ok(())
}

fn print_header(scenario: &TestScenario, verbose: bool) {
    println!(
        "\n{} {} {}",
        "Running Scenario:".blue().bold(),
        scenario.name.white().bold(),
        format!("({})", scenario.backend).dimmed()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }
    if verbose {
        for (i, step) in scenario.steps.iter().enumerate() {
            let marker = if step.critical { "hard" } else { "soft" };
            println!(
                "  {} {} {}",
                format!("{}.", i + 1).dimmed(),
                step.action.describe(),
                format!("[{}]", marker).dimmed()
            );
        }
    }
}

/// Load, check and run the scenario at `path`
///
/// Parse and validation errors are returned before any session exists;
/// everything after that is recorded in the summary.
pub async fn run_scenario(
    path: &Path,
    runner: &ScenarioRunner,
    options: &SessionOptions,
    verbose: bool,
) -> Result<RunSummary> {
    let scenario = load_scenario(path)?;
    validate(&scenario)?;
    print_header(&scenario, verbose);

    let summary = match scenario.backend {
        BackendKind::Browser => {
            let compiled = Scenario::new(scenario.name.as_str()).steps(
                scenario
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| browser_step(i, step)),
            );
            runner.execute(&compiled, options).await
        }
        BackendKind::Http => {
            let compiled = Scenario::new(scenario.name.as_str()).steps(
                scenario
                    .steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| http_step(i, step)),
            );
            runner.execute(&compiled, options).await
        }
    };
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RunState, StepOutcome};
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scenario_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_wrong_backend_rejected() {
        let scenario: TestScenario = serde_yaml::from_str(
            "name: mixed\nbackend: http\nsteps:\n  - action: navigate\n    path: /\n",
        )
        .unwrap();
        let err = validate(&scenario).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("browser session")));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let scenario: TestScenario = serde_yaml::from_str(
            "name: bad\nbackend: http\nsteps:\n  - action: request\n    method: \"GE T\"\n    path: /\n",
        )
        .unwrap();
        assert!(validate(&scenario).is_err());
    }

    #[test]
    fn test_empty_scenario_rejected() {
        let scenario: TestScenario =
            serde_yaml::from_str("name: empty\nbackend: browser\nsteps: []\n").unwrap();
        assert!(validate(&scenario).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = load_scenario(Path::new("/nonexistent/scenario.yaml"));
        assert!(matches!(result, Err(Error::FileRead { .. })));
    }

    #[tokio::test]
    async fn test_validation_happens_before_acquisition() {
        // An unreachable WebDriver would fail acquisition; validation must fail first
        let file = scenario_file("name: x\nbackend: browser\nsteps:\n  - action: request\n    path: /\n");
        let mut options = SessionOptions::new("http://127.0.0.1:9");
        options.webdriver_url = "http://127.0.0.1:9".to_string();
        let result = run_scenario(file.path(), &ScenarioRunner::new(), &options, false).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_http_scenario_runs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/getusers"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"message\":\"Unauthorized\"}"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/user/signoutuser"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let file = scenario_file(
            r#"
name: api smoke
backend: http
steps:
  - name: users need auth
    action: request
    path: /api/user/getusers
    expect_status: [401, 403]
    body_contains: Unauthorized
  - name: sign out
    critical: false
    action: request
    method: post
    path: /api/user/signoutuser
  - action: request
    path: /api/user/getusers
    expect_status: [200]
"#,
        );

        let summary = run_scenario(
            file.path(),
            &ScenarioRunner::new(),
            &SessionOptions::new(server.uri()),
            true,
        )
        .await
        .unwrap();

        assert_eq!(summary.scenario(), "api smoke");
        assert_eq!(summary.state(), RunState::Aborted);
        let outcomes: Vec<_> = summary.entries().iter().map(|e| e.outcome().clone()).collect();
        assert_eq!(outcomes[0], StepOutcome::Passed);
        assert!(matches!(outcomes[1], StepOutcome::Warned(_)));
        assert!(matches!(outcomes[2], StepOutcome::Failed(_)));
        assert_eq!(summary.entries()[2].name(), "3. GET /api/user/getusers");
    }
}
