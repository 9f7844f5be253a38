//! Built-in scenario catalog
//!
//! Scenarios are named `<suite>::<name>` and tagged. A selector matches a
//! scenario by full name, by suite, or by tag; no selector selects all.

pub mod admin;
pub mod api;
pub mod auth;
pub mod features;
pub mod posts;
pub mod smoke;
mod ui;

use crate::common::{unique_suffix, Config, Error, Result, SessionOptions};
use crate::driver::{BrowserSession, HttpSession};
use crate::engine::{Backend, RunSummary, Scenario, ScenarioRunner, Session};

/// Password used for every generated account
pub const TEST_PASSWORD: &str = "TestPassword123!";

/// Longest username the sign-up form accepts
pub const MAX_USERNAME_LEN: usize = 30;

/// A catalog scenario together with the backend it needs
pub enum Plan {
    Browser(Scenario<BrowserSession>),
    Http(Scenario<HttpSession>),
}

impl Plan {
    pub fn name(&self) -> &str {
        match self {
            Self::Browser(s) => &s.name,
            Self::Http(s) => &s.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Browser(s) => s.description.as_deref(),
            Self::Http(s) => s.description.as_deref(),
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Self::Browser(s) => &s.tags,
            Self::Http(s) => &s.tags,
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Browser(_) => BrowserSession::kind(),
            Self::Http(_) => HttpSession::kind(),
        }
    }

    /// Suite part of the name (`auth` for `auth::login`)
    pub fn suite(&self) -> &str {
        self.name().split("::").next().unwrap_or_default()
    }

    pub fn step_count(&self) -> usize {
        match self {
            Self::Browser(s) => s.steps.len(),
            Self::Http(s) => s.steps.len(),
        }
    }

    /// Whether `selector` names this scenario, its suite or one of its tags
    pub fn matches(&self, selector: &str) -> bool {
        self.name() == selector || self.suite() == selector || self.tags().iter().any(|t| t == selector)
    }

    /// Run the scenario on a fresh session of its own
    pub async fn execute(&self, runner: &ScenarioRunner, options: &SessionOptions) -> RunSummary {
        match self {
            Self::Browser(s) => runner.execute(s, options).await,
            Self::Http(s) => runner.execute(s, options).await,
        }
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name())
            .field("backend", &self.backend())
            .field("tags", &self.tags())
            .finish()
    }
}

/// Every built-in scenario, in run order
pub fn catalog(config: &Config) -> Vec<Plan> {
    let mut plans = vec![Plan::Browser(smoke::pages())];
    plans.extend(auth::scenarios().into_iter().map(Plan::Browser));
    plans.extend(posts::scenarios().into_iter().map(Plan::Browser));
    plans.extend(features::scenarios().into_iter().map(Plan::Browser));
    plans.push(Plan::Http(api::suite()));
    plans.push(Plan::Http(admin::users(
        &config.admin,
        config.features.skip_admin_tests,
    )));
    plans
}

/// Keep the plans matching any of `selectors`
///
/// A selector that matches nothing is a configuration error.
pub fn select(plans: Vec<Plan>, selectors: &[String]) -> Result<Vec<Plan>> {
    if selectors.is_empty() {
        return Ok(plans);
    }
    if let Some(unknown) = selectors
        .iter()
        .find(|sel| !plans.iter().any(|p| p.matches(sel)))
    {
        return Err(Error::Config(format!(
            "no scenario matches '{}' (try `blogcheck list`)",
            unknown
        )));
    }
    Ok(plans
        .into_iter()
        .filter(|p| selectors.iter().any(|sel| p.matches(sel)))
        .collect())
}

/// A generated test account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Fresh credentials, unique per run
    ///
    /// The prefix is shortened when needed so the username fits
    /// [`MAX_USERNAME_LEN`]; the unique suffix is always kept whole.
    pub fn generate(prefix: &str) -> Self {
        Self::with_suffix(prefix, &unique_suffix())
    }

    fn with_suffix(prefix: &str, suffix: &str) -> Self {
        let room = MAX_USERNAME_LEN.saturating_sub(suffix.len());
        let prefix: String = prefix.to_lowercase().chars().take(room).collect();
        let name = format!("{}{}", prefix, suffix);
        Self {
            username: name.clone(),
            email: format!("{}@test.com", name),
            password: TEST_PASSWORD.to_string(),
        }
    }

    /// Hand the credentials to later steps of the same session
    pub fn remember<B: Backend>(&self, session: &mut Session<B>) {
        session.set_var("username", &self.username);
        session.set_var("email", &self.email);
        session.set_var("password", &self.password);
    }

    /// Credentials remembered by an earlier step
    pub fn recall<B: Backend>(session: &Session<B>) -> Result<Self> {
        Ok(Self {
            username: session.require_var("username")?,
            email: session.require_var("email")?,
            password: session.require_var("password")?,
        })
    }
}

/// Assertion helper for step bodies
pub(crate) fn ensure(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::assertion(message))
    }
}
