//! Account registration and sign-in flows

use std::time::Duration;

use super::ui::{
    attempt_login, attempt_register, expect_rejected, login_step, register_step, Browser,
    BrowserStep,
};
use super::Credentials;
use crate::common::Result;
use crate::driver::{BrowserSession, Locator};
use crate::engine::Scenario;

const SIGN_OUT: &str = "//button[contains(text(), 'Sign out') or contains(text(), 'Sign Out') or contains(text(), 'Logout')]";

pub fn scenarios() -> Vec<Scenario<BrowserSession>> {
    vec![
        registration(),
        duplicate_email(),
        login(),
        invalid_login(),
        logout(),
    ]
}

fn registration() -> Scenario<BrowserSession> {
    Scenario::new("auth::register")
        .describe("A new account can register and is sent to sign-in")
        .tag("ui")
        .step(register_step("testuser"))
}

fn duplicate_email() -> Scenario<BrowserSession> {
    Scenario::new("auth::duplicate-email")
        .describe("Registering the same email twice is rejected")
        .tag("ui")
        .step(register_step("duplicate"))
        .step(BrowserStep::hard("register same email again", |s| {
            Box::pin(register_again(s))
        }))
}

async fn register_again(s: &mut Browser) -> Result<()> {
    let first = Credentials::recall(s)?;
    let second = Credentials {
        username: format!("{}b", first.username),
        ..first
    };
    attempt_register(s, &second).await?;
    expect_rejected(s, "sign-up").await
}

fn login() -> Scenario<BrowserSession> {
    Scenario::new("auth::login")
        .describe("A registered account can sign in")
        .tag("ui")
        .step(register_step("logintest"))
        .step(login_step())
}

fn invalid_login() -> Scenario<BrowserSession> {
    Scenario::new("auth::invalid-login")
        .describe("Wrong credentials are rejected")
        .tag("ui")
        .step(BrowserStep::hard("sign in with wrong password", |s| {
            Box::pin(async move {
                attempt_login(s, "invalid@email.com", "WrongPassword123!").await?;
                expect_rejected(s, "sign-in").await
            })
        }))
}

fn logout() -> Scenario<BrowserSession> {
    Scenario::new("auth::logout")
        .describe("A signed-in user can sign out")
        .tag("ui")
        .step(register_step("logouttest"))
        .step(login_step())
        .step(BrowserStep::soft("sign out", |s| Box::pin(sign_out(s))))
}

async fn sign_out(s: &mut Browser) -> Result<()> {
    let home = s.url("/");
    let browser = s.backend()?;
    browser.click(&Locator::xpath(SIGN_OUT)).await?;
    let wait = browser.wait().with_timeout(Duration::from_secs(5));
    browser
        .wait_for_url(|url| url.contains("sign-in") || url == home, wait)
        .await?;
    Ok(())
}
