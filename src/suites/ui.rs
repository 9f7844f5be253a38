//! Page flows shared by the browser scenarios

use std::time::Duration;

use super::{ensure, Credentials};
use crate::common::Result;
use crate::driver::{BrowserSession, Locator};
use crate::engine::{Session, Step};

pub(crate) type Browser = Session<BrowserSession>;
pub(crate) type BrowserStep = Step<BrowserSession>;

pub(crate) const SUBMIT: &str = "button[type='submit']";
pub(crate) const FORM_ERROR: &str = ".text-red-500, .text-red-600, [role='alert']";

/// Navigate to `path` under the base URL
pub(crate) async fn open(s: &mut Browser, path: &str) -> Result<()> {
    let url = s.url(path);
    s.backend()?.goto(&url).await
}

async fn submit_sign_up(browser: &BrowserSession, creds: &Credentials) -> Result<()> {
    browser.fill(&Locator::id("username"), &creds.username).await?;
    browser.fill(&Locator::id("email"), &creds.email).await?;
    browser.fill(&Locator::id("password"), &creds.password).await?;
    browser.click(&Locator::css(SUBMIT)).await
}

async fn submit_sign_in(browser: &BrowserSession, email: &str, password: &str) -> Result<()> {
    browser.fill(&Locator::id("email"), email).await?;
    browser.fill(&Locator::id("password"), password).await?;
    browser.click(&Locator::css(SUBMIT)).await
}

/// Fill the sign-up form and expect the redirect to sign-in
pub(crate) async fn register(s: &mut Browser, creds: &Credentials) -> Result<()> {
    open(s, "/sign-up").await?;
    let browser = s.backend()?;
    submit_sign_up(browser, creds).await?;
    browser
        .wait_for_url(|url| url.contains("sign-in"), browser.wait())
        .await?;
    Ok(())
}

/// Submit the sign-up form without waiting for any outcome
pub(crate) async fn attempt_register(s: &mut Browser, creds: &Credentials) -> Result<()> {
    open(s, "/sign-up").await?;
    submit_sign_up(s.backend()?, creds).await
}

/// Sign in and expect to leave the sign-in page
pub(crate) async fn login(s: &mut Browser, creds: &Credentials) -> Result<()> {
    open(s, "/sign-in").await?;
    let browser = s.backend()?;
    submit_sign_in(browser, &creds.email, &creds.password).await?;
    browser
        .wait_for_url(|url| !url.contains("sign-in"), browser.wait())
        .await?;
    Ok(())
}

/// Submit the sign-in form without waiting for any outcome
pub(crate) async fn attempt_login(s: &mut Browser, email: &str, password: &str) -> Result<()> {
    open(s, "/sign-in").await?;
    submit_sign_in(s.backend()?, email, password).await
}

/// A rejected form shows an error message or stays on `page`
pub(crate) async fn expect_rejected(s: &mut Browser, page: &str) -> Result<()> {
    let browser = s.backend()?;
    let short = browser.wait().with_timeout(Duration::from_secs(3));
    if browser.wait_for(&Locator::css(FORM_ERROR), short).await.is_ok() {
        return Ok(());
    }
    let url = browser.current_url().await?;
    ensure(
        url.contains(page),
        format!("no error shown and the browser left {} (now at {})", page, url),
    )
}

/// Hard step: register a fresh account and remember it
pub(crate) fn register_step(prefix: &'static str) -> BrowserStep {
    BrowserStep::hard("register account", move |s| {
        Box::pin(async move {
            let creds = Credentials::generate(prefix);
            register(s, &creds).await?;
            creds.remember(s);
            Ok(())
        })
    })
}

/// Hard step: sign in with the remembered account
pub(crate) fn login_step() -> BrowserStep {
    BrowserStep::hard("log in", |s| {
        Box::pin(async move {
            let creds = Credentials::recall(s)?;
            login(s, &creds).await
        })
    })
}
