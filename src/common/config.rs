//! Configuration file handling
//!
//! Layering, lowest precedence first: built-in defaults, the TOML config
//! file, environment variables, then CLI flags (applied by the caller).

use serde::Deserialize;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// WebDriver / browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Admin account used by the admin scenarios
    #[serde(default)]
    pub admin: AdminConfig,

    /// Feature toggles
    #[serde(default)]
    pub features: Features,
}

/// Application under test
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base URL of the blogging application
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

/// Browser settings
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// WebDriver server (chromedriver) URL
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run Chrome without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Maximum time for a single page load
    #[serde(default = "default_page_load")]
    pub page_load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            page_load_timeout_secs: default_page_load(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    800
}
fn default_window_height() -> u32 {
    600
}
fn default_page_load() -> u64 {
    30
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Maximum time to wait for a session to become ready
    #[serde(default = "default_session_ready")]
    pub session_ready_ms: u64,

    /// Default bound for condition waits
    #[serde(default = "default_wait")]
    pub wait_secs: u64,

    /// Spacing between predicate evaluations
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for a single HTTP request
    #[serde(default = "default_request")]
    pub request_secs: u64,

    /// Upper bound for one step, including all of its waits
    #[serde(default = "default_step")]
    pub step_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            session_ready_ms: default_session_ready(),
            wait_secs: default_wait(),
            poll_interval_ms: default_poll_interval(),
            request_secs: default_request(),
            step_secs: default_step(),
        }
    }
}

fn default_session_ready() -> u64 {
    30_000
}
fn default_wait() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    250
}
fn default_request() -> u64 {
    10
}
fn default_step() -> u64 {
    120
}

/// Admin credentials
#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    #[serde(default = "default_admin_email")]
    pub email: String,

    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            password: default_admin_password(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@blog.com".to_string()
}
fn default_admin_password() -> String {
    "Admin123!".to_string()
}

/// Feature toggles
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Features {
    /// Skip scenarios that need the admin account
    #[serde(default)]
    pub skip_admin_tests: bool,
}

/// Explicit options handed to session acquisition
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Run without a visible UI
    pub headless: bool,
    /// Maximum time to wait for session readiness
    pub timeout_ms: u64,
    pub base_url: String,
    pub webdriver_url: String,
    pub request_timeout: Duration,
    pub page_load_timeout: Duration,
    pub window: (u32, u32),
    /// Default bound and spacing for condition waits inside steps
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl SessionOptions {
    /// Options for a session against `base_url` with default timings
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut config = Config::default();
        config.target.base_url = base_url.into();
        config.session_options()
    }

    /// Reject options no backend could work with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base URL is empty".to_string()));
        }
        if !self.base_url.starts_with("http") {
            return Err(Error::Config(format!(
                "base URL must start with http: {}",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config(
                "session readiness timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve a path against the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() || path == "/" {
            format!("{}/", base)
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

impl Config {
    /// Load configuration from the default config file and the environment
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                Self::from_toml(&content)?
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APP_URL").filter(|v| !v.is_empty()) {
            self.target.base_url = url;
        }
        if let Some(url) = lookup("WEBDRIVER_URL").filter(|v| !v.is_empty()) {
            self.browser.webdriver_url = url;
        }
        if let Some(email) = lookup("ADMIN_EMAIL") {
            self.admin.email = email;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(flag) = lookup("SKIP_ADMIN_TESTS") {
            self.features.skip_admin_tests = flag.eq_ignore_ascii_case("true");
        }
    }

    /// Build the explicit options handed to session acquisition
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            headless: self.browser.headless,
            timeout_ms: self.timeouts.session_ready_ms,
            base_url: self.target.base_url.clone(),
            webdriver_url: self.browser.webdriver_url.clone(),
            request_timeout: Duration::from_secs(self.timeouts.request_secs),
            page_load_timeout: Duration::from_secs(self.browser.page_load_timeout_secs),
            window: (self.browser.window_width, self.browser.window_height),
            wait_timeout: Duration::from_secs(self.timeouts.wait_secs),
            poll_interval: Duration::from_millis(self.timeouts.poll_interval_ms),
        }
    }
}
