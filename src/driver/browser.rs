//! Browser sessions over the W3C WebDriver protocol
//!
//! Talks to a running chromedriver. Implicit waits are disabled: every wait
//! goes through the bounded poller so timeouts are explicit per call.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

use crate::common::{Error, Result, SessionOptions};
use crate::engine::{poll_for, Backend, Wait};

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Id(String),
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
    Tag(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    fn by(&self) -> By {
        match self {
            Self::Id(id) => By::Id(id.clone()),
            Self::Css(css) => By::Css(css.clone()),
            Self::XPath(xpath) => By::XPath(xpath.clone()),
            Self::Tag(tag) => By::Tag(tag.clone()),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::Css(css) => write!(f, "css `{}`", css),
            Self::XPath(xpath) => write!(f, "xpath `{}`", xpath),
            Self::Tag(tag) => write!(f, "<{}>", tag),
        }
    }
}

/// Chrome arguments for a session
fn chrome_args(options: &SessionOptions) -> Vec<String> {
    let mut args = Vec::new();
    if options.headless {
        args.extend(
            [
                "--headless=new",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--disable-extensions",
                "--disable-software-rasterizer",
            ]
            .map(String::from),
        );
        args.push(format!("--window-size={},{}", options.window.0, options.window.1));
    }
    // Memory and stability
    args.extend(
        [
            "--disable-background-networking",
            "--disable-default-apps",
            "--disable-sync",
            "--mute-audio",
            "--no-first-run",
            "--disable-blink-features=AutomationControlled",
        ]
        .map(String::from),
    );
    args
}

/// A browser driven through chromedriver
pub struct BrowserSession {
    driver: Option<WebDriver>,
    wait: Wait,
}

async fn configure(driver: &WebDriver, options: &SessionOptions) -> Result<()> {
    driver.set_page_load_timeout(options.page_load_timeout).await?;
    driver.set_implicit_wait_timeout(Duration::ZERO).await?;
    Ok(())
}

#[async_trait]
impl Backend for BrowserSession {
    fn kind() -> &'static str {
        "browser"
    }

    async fn open(options: &SessionOptions) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in chrome_args(options) {
            caps.add_arg(&arg)?;
        }

        let driver = WebDriver::new(options.webdriver_url.clone(), caps)
            .await
            .map_err(|e| {
                Error::Acquisition(format!(
                    "WebDriver at {} refused a session: {}",
                    options.webdriver_url, e
                ))
            })?;

        // The browser exists now; it must not outlive a failed setup
        if let Err(e) = configure(&driver, options).await {
            if let Err(quit_err) = driver.quit().await {
                tracing::warn!(error = %quit_err, "Failed to quit browser after setup error");
            }
            return Err(Error::Acquisition(format!("browser setup failed: {}", e)));
        }

        tracing::debug!(webdriver = %options.webdriver_url, headless = options.headless, "Browser started");
        Ok(Self {
            driver: Some(driver),
            wait: Wait::from_options(options),
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await?;
        }
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = driver.quit().await {
                            tracing::warn!(error = %e, "Failed to quit abandoned browser");
                        }
                    });
                }
                Err(_) => tracing::warn!("Browser abandoned outside a runtime; chromedriver keeps it"),
            }
        }
    }
}

impl BrowserSession {
    fn driver(&self) -> Result<&WebDriver> {
        self.driver.as_ref().ok_or(Error::SessionReleased)
    }

    /// The session's default wait
    pub fn wait(&self) -> Wait {
        self.wait
    }

    /// Navigate to an absolute URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.driver()?.goto(url.to_string()).await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.driver()?.current_url().await?.to_string())
    }

    pub async fn title(&self) -> Result<String> {
        Ok(self.driver()?.title().await?)
    }

    pub async fn source(&self) -> Result<String> {
        Ok(self.driver()?.source().await?)
    }

    /// All elements matching `locator`, visible or not
    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<WebElement>> {
        Ok(self.driver()?.find_all(locator.by()).await?)
    }

    /// First displayed element matching `locator`, if any
    pub async fn try_find(&self, locator: &Locator) -> Result<Option<WebElement>> {
        for element in self.find_all(locator).await? {
            if element.is_displayed().await? {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    /// Wait until a displayed element matches `locator`
    pub async fn wait_for(&self, locator: &Locator, wait: Wait) -> Result<WebElement> {
        poll_for(|| self.try_find(locator), wait)
            .await
            .map_err(|e| with_locator(e, locator))
    }

    /// Wait until a displayed and enabled element matches `locator`
    pub async fn wait_for_clickable(&self, locator: &Locator, wait: Wait) -> Result<WebElement> {
        poll_for(
            || async move {
                match self.try_find(locator).await? {
                    Some(element) => {
                        let enabled = element.is_enabled().await?;
                        Ok(enabled.then_some(element))
                    }
                    None => Ok(None),
                }
            },
            wait,
        )
        .await
        .map_err(|e| with_locator(e, locator))
    }

    /// Type `text` into the element
    pub async fn fill(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.wait_for(locator, self.wait).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    /// Replace the element's value with `text`
    pub async fn replace(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.wait_for(locator, self.wait).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    pub async fn clear(&self, locator: &Locator) -> Result<()> {
        let element = self.wait_for(locator, self.wait).await?;
        element.clear().await?;
        Ok(())
    }

    /// Whether any element matching `locator` is currently displayed
    pub async fn is_displayed(&self, locator: &Locator) -> Result<bool> {
        Ok(self.try_find(locator).await?.is_some())
    }

    pub async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.wait_for_clickable(locator, self.wait).await?;
        element.click().await?;
        Ok(())
    }

    /// Click the element if it shows up within `wait`; report whether it did
    pub async fn click_if_present(&self, locator: &Locator, wait: Wait) -> Result<bool> {
        match self.wait_for_clickable(locator, wait).await {
            Ok(element) => {
                element.click().await?;
                Ok(true)
            }
            Err(Error::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of elements matching `locator`
    pub async fn count(&self, locator: &Locator) -> Result<usize> {
        Ok(self.find_all(locator).await?.len())
    }

    /// Attribute of the first element matching `locator`
    pub async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let element = self.driver()?.find(locator.by()).await?;
        Ok(element.attr(name).await?)
    }

    /// Visible text of the first displayed element matching `locator`
    pub async fn text(&self, locator: &Locator) -> Result<String> {
        let element = self.wait_for(locator, self.wait).await?;
        Ok(element.text().await?)
    }

    pub async fn execute_script(&self, script: &str) -> Result<serde_json::Value> {
        let ret = self.driver()?.execute(script.to_string(), Vec::new()).await?;
        Ok(ret.json().clone())
    }

    /// Wait until the current URL satisfies `pred`; returns that URL
    pub async fn wait_for_url<P>(&self, pred: P, wait: Wait) -> Result<String>
    where
        P: Fn(&str) -> bool,
    {
        let pred = &pred;
        poll_for(
            || async move {
                let url = self.current_url().await?;
                Ok(pred(&url).then_some(url))
            },
            wait,
        )
        .await
        .map_err(|e| match e {
            Error::Timeout { waited_ms, last_error: None } => Error::Timeout {
                waited_ms,
                last_error: Some("URL never reached the expected page".to_string()),
            },
            other => other,
        })
    }
}

fn with_locator(e: Error, locator: &Locator) -> Error {
    match e {
        Error::Timeout {
            waited_ms,
            last_error,
        } => Error::Timeout {
            waited_ms,
            last_error: Some(match last_error {
                Some(err) => format!("{} ({})", locator, err),
                None => format!("no visible element matches {}", locator),
            }),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_args() {
        let options = SessionOptions::new("http://localhost:8081");
        let args = chrome_args(&options);
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=800,600".to_string()));
        assert!(args.contains(&"--mute-audio".to_string()));
    }

    #[test]
    fn test_headed_args_skip_headless_flags() {
        let mut options = SessionOptions::new("http://localhost:8081");
        options.headless = false;
        let args = chrome_args(&options);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--no-first-run".to_string()));
    }

    #[test]
    fn test_locator_from_yaml() {
        // Scenario files hand locators over as already-parsed YAML values
        let value: serde_yaml::Value = serde_yaml::from_str(
            "- id: email\n- css: \"button[type='submit']\"\n- xpath: //button\n- tag: html\n",
        )
        .unwrap();
        let locators: Vec<Locator> = serde_yaml::from_value(value).unwrap();
        assert_eq!(
            locators,
            vec![
                Locator::id("email"),
                Locator::css("button[type='submit']"),
                Locator::xpath("//button"),
                Locator::tag("html"),
            ]
        );
    }

    #[test]
    fn test_timeout_mentions_locator() {
        let e = with_locator(Error::timeout(100, None), &Locator::id("username"));
        assert_eq!(
            e.to_string(),
            "Condition not met after 100 ms (last error: no visible element matches #username)"
        );
    }

    #[tokio::test]
    #[ignore = "requires chromedriver on WEBDRIVER_URL and the app on APP_URL"]
    async fn test_live_homepage() {
        let mut config = crate::common::Config::default();
        config.apply_env(|k| std::env::var(k).ok());
        let options = config.session_options();
        let mut browser = BrowserSession::open(&options).await.unwrap();
        browser.goto(&options.url("/")).await.unwrap();
        assert!(browser.source().await.unwrap().len() > 100);
        browser.close().await.unwrap();
        browser.close().await.unwrap();
    }
}
