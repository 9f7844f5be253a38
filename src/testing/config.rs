//! Declarative scenario file format
//!
//! Defines the data structures for deserializing YAML scenarios.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::driver::Locator;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct TestScenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Which kind of session the steps drive
    pub backend: BackendKind,
    /// The sequence of steps to execute
    pub steps: Vec<TestStep>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Browser,
    Http,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Browser => write!(f, "browser"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// A single step: optional `name`, `critical` (default true) and the action
#[derive(Debug, Clone)]
pub struct TestStep {
    pub name: Option<String>,
    pub critical: bool,
    pub action: StepAction,
}

impl<'de> Deserialize<'de> for TestStep {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut map = serde_yaml::Mapping::deserialize(deserializer)?;
        let name = map
            .remove("name")
            .map(serde_yaml::from_value::<String>)
            .transpose()
            .map_err(D::Error::custom)?;
        let critical = map
            .remove("critical")
            .map(serde_yaml::from_value::<bool>)
            .transpose()
            .map_err(D::Error::custom)?
            .unwrap_or(true);
        let action = StepAction::deserialize(serde_yaml::Value::Mapping(map))
            .map_err(D::Error::custom)?;
        Ok(Self {
            name,
            critical,
            action,
        })
    }
}

/// What a step does, selected by the `action` key
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    /// Load a page relative to the base URL
    Navigate(Navigate),
    /// Wait for a visible element
    WaitFor(WaitFor),
    /// Type into an element
    Fill(Fill),
    Click(Click),
    /// Wait until the current URL contains a substring
    ExpectUrl(ExpectUrl),
    /// Wait until an element's text (the page body by default) contains a substring
    ExpectText(ExpectText),
    /// Wait until at least `min` elements match
    ExpectCount(ExpectCount),
    /// Send an HTTP request and check the response
    Request(Request),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Navigate {
    pub path: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct WaitFor {
    pub locator: Locator,
    /// Overrides the configured wait bound
    pub timeout_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Fill {
    pub locator: Locator,
    pub text: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Click {
    pub locator: Locator,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExpectUrl {
    pub contains: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExpectText {
    pub locator: Option<Locator>,
    pub contains: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExpectCount {
    pub locator: Locator,
    #[serde(default = "default_min")]
    pub min: usize,
}

fn default_min() -> usize {
    1
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    /// JSON request body
    pub body: Option<serde_json::Value>,
    /// Accepted statuses; any 2xx when absent
    pub expect_status: Option<Vec<u16>>,
    pub body_contains: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl StepAction {
    /// Backend the action needs
    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Request(_) => BackendKind::Http,
            _ => BackendKind::Browser,
        }
    }

    /// Short human description, used when a step has no name
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate(a) => format!("navigate to {}", a.path),
            Self::WaitFor(a) => format!("wait for {}", a.locator),
            Self::Fill(a) => format!("fill {}", a.locator),
            Self::Click(a) => format!("click {}", a.locator),
            Self::ExpectUrl(a) => format!("expect url containing '{}'", a.contains),
            Self::ExpectText(a) => format!("expect text '{}'", a.contains),
            Self::ExpectCount(a) => format!("expect at least {} of {}", a.min, a.locator),
            Self::Request(a) => format!("{} {}", a.method.to_uppercase(), a.path),
        }
    }
}
