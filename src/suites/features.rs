//! Comments and theme switching

use super::ensure;
use super::ui::{login_step, open, register_step, Browser, BrowserStep};
use crate::common::Result;
use crate::driver::{BrowserSession, Locator};
use crate::engine::{poll, Scenario};

pub const COMMENT_TEXT: &str = "This is an automated test comment!";

const POST_LINK: &str = "article a, .post-card a, [href*='/post/']";
const COMMENT_INPUT: &str =
    "textarea[placeholder*='comment' i], textarea[name='comment'], .comment-input";
const COMMENT_SUBMIT: &str = "//button[contains(text(), 'Submit') or contains(text(), 'Post') or contains(text(), 'Comment')]";
const COMMENT: &str = ".comment, .comment-item, [class*='comment']";
const THEME_TOGGLE: &str =
    "button[aria-label*='theme' i], .theme-toggle, [class*='theme-toggle']";

pub fn scenarios() -> Vec<Scenario<BrowserSession>> {
    vec![comment(), theme_toggle()]
}

fn comment() -> Scenario<BrowserSession> {
    Scenario::new("features::comment")
        .describe("A signed-in user can comment on a post")
        .tag("ui")
        .step(register_step("featuretest"))
        .step(login_step())
        .step(BrowserStep::soft("add comment", |s| Box::pin(add_comment(s))))
}

fn theme_toggle() -> Scenario<BrowserSession> {
    Scenario::new("features::theme-toggle")
        .describe("The theme switch changes and restores the page theme")
        .tag("ui")
        .step(register_step("featuretest"))
        .step(login_step())
        .step(BrowserStep::soft("toggle theme", |s| Box::pin(toggle_theme(s))))
}

async fn add_comment(s: &mut Browser) -> Result<()> {
    open(s, "/").await?;
    let browser = &*s.backend()?;
    browser.click(&Locator::css(POST_LINK)).await?;
    browser
        .execute_script("window.scrollTo(0, document.body.scrollHeight);")
        .await?;
    let input = Locator::css(COMMENT_INPUT);
    browser.clear(&input).await?;
    browser.fill(&input, COMMENT_TEXT).await?;
    browser.click(&Locator::xpath(COMMENT_SUBMIT)).await?;

    let comments = &Locator::css(COMMENT);
    poll(
        || async move { browser.is_displayed(comments).await },
        browser.wait(),
    )
    .await
}

async fn html_class(browser: &BrowserSession) -> Result<String> {
    Ok(browser
        .attribute(&Locator::tag("html"), "class")
        .await?
        .unwrap_or_default())
}

async fn toggle_theme(s: &mut Browser) -> Result<()> {
    open(s, "/").await?;
    let browser = &*s.backend()?;
    let toggle = Locator::css(THEME_TOGGLE);
    let initial = html_class(browser).await?;

    browser.click(&toggle).await?;
    let initial_ref = &initial;
    poll(
        || async move { Ok(html_class(browser).await? != *initial_ref) },
        browser.wait(),
    )
    .await?;

    browser.click(&toggle).await?;
    poll(
        || async move { Ok(html_class(browser).await? == *initial_ref) },
        browser.wait(),
    )
    .await?;

    let restored = html_class(browser).await?;
    ensure(
        restored == initial,
        format!("theme did not toggle back: '{}' became '{}'", initial, restored),
    )
}
