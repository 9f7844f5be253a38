//! Page smoke checks
//!
//! Only the homepage load is a prerequisite; everything else warns.

use std::time::{Duration, Instant};

use super::ensure;
use super::ui::{open, Browser, BrowserStep};
use crate::common::Result;
use crate::driver::{BrowserSession, Locator};
use crate::engine::Scenario;

const MAX_HOMEPAGE_LOAD: Duration = Duration::from_secs(10);

pub fn pages() -> Scenario<BrowserSession> {
    Scenario::new("smoke::pages")
        .describe("Public pages load and render")
        .tag("smoke")
        .tag("ui")
        .steps([
            BrowserStep::hard("homepage loads", |s| Box::pin(homepage_loads(s))),
            BrowserStep::soft("page has a title", |s| Box::pin(has_title(s))),
            BrowserStep::soft("document structure", |s| Box::pin(document_structure(s))),
            BrowserStep::soft("javascript executes", |s| Box::pin(javascript_executes(s))),
            BrowserStep::soft("sign-up page reachable", |s| {
                Box::pin(page_reachable(s, "/sign-up", &["sign-up", "signup"]))
            }),
            BrowserStep::soft("sign-in page reachable", |s| {
                Box::pin(page_reachable(s, "/sign-in", &["sign-in", "signin"]))
            }),
            BrowserStep::soft("navigation keeps urls", |s| Box::pin(navigation(s))),
            BrowserStep::soft("homepage loads quickly", |s| Box::pin(load_time(s))),
        ])
}

async fn homepage_loads(s: &mut Browser) -> Result<()> {
    open(s, "/").await?;
    let source = s.backend()?.source().await?;
    ensure(
        source.len() > 100,
        format!("homepage has almost no content ({} bytes)", source.len()),
    )
}

async fn has_title(s: &mut Browser) -> Result<()> {
    let title = s.backend()?.title().await?;
    ensure(!title.trim().is_empty(), "homepage title is empty")
}

async fn document_structure(s: &mut Browser) -> Result<()> {
    let browser = s.backend()?;
    for tag in ["html", "head", "body"] {
        ensure(
            browser.count(&Locator::tag(tag)).await? > 0,
            format!("document has no <{}>", tag),
        )?;
    }
    ensure(
        browser.count(&Locator::id("root")).await? > 0,
        "application root #root is missing",
    )
}

async fn javascript_executes(s: &mut Browser) -> Result<()> {
    let value = s.backend()?.execute_script("return 1 + 1;").await?;
    ensure(
        value.as_i64() == Some(2),
        format!("script returned {} instead of 2", value),
    )
}

async fn page_reachable(s: &mut Browser, path: &str, markers: &[&str]) -> Result<()> {
    open(s, path).await?;
    let browser = s.backend()?;
    let url = browser.current_url().await?.to_lowercase();
    ensure(
        markers.iter().any(|m| url.contains(m)),
        format!("{} redirected to {}", path, url),
    )?;
    let source = browser.source().await?;
    ensure(source.len() > 50, format!("{} rendered no content", path))
}

async fn navigation(s: &mut Browser) -> Result<()> {
    open(s, "/").await?;
    let home = s.backend()?.current_url().await?;
    ensure(home.starts_with("http"), format!("unexpected homepage URL {}", home))?;

    open(s, "/sign-up").await?;
    let url = s.backend()?.current_url().await?;
    ensure(
        url.contains("sign-up"),
        format!("navigating to /sign-up ended at {}", url),
    )
}

async fn load_time(s: &mut Browser) -> Result<()> {
    let start = Instant::now();
    open(s, "/").await?;
    let elapsed = start.elapsed();
    ensure(
        elapsed < MAX_HOMEPAGE_LOAD,
        format!("homepage took {:.2}s to load", elapsed.as_secs_f64()),
    )
}
