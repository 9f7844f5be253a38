//! Blog post lifecycle through the UI
//!
//! Each scenario signs up a fresh author. Post interactions depend on page
//! markup that varies between builds, so they only warn.

use std::time::Duration;

use super::ensure;
use super::ui::{login_step, open, register_step, Browser, BrowserStep};
use crate::common::Result;
use crate::driver::{BrowserSession, Locator};
use crate::engine::{poll, Scenario, Wait};

pub const POST_TITLE: &str = "Test Blog Post - Automated Test";
pub const POST_CONTENT: &str = "This is a test blog post created by automated tests. \
    This post is for automated testing purposes and can be safely deleted.";

const DASHBOARD_POSTS: &str = "/dashboard?tab=posts";
const CREATE_LINK: &str =
    "//a[contains(@href, 'create-post')] | //button[contains(text(), 'Create') or contains(text(), 'New Post')]";
const TITLE_INPUT: &str = "input[name='title'], input#title, input[placeholder*='title' i]";
const CONTENT_INPUT: &str =
    "textarea[name='content'], textarea#content, .ql-editor, [contenteditable='true']";
const PUBLISH: &str = "//button[contains(text(), 'Publish') or contains(text(), 'Create') or contains(text(), 'Submit')]";
const POST_LINK: &str = "article a, .post-card a, [href*='/post/'], [href*='/blog/']";
const POST_BODY: &str = "article, .post-content, .blog-content, main";
const EDIT: &str =
    "//button[contains(text(), 'Edit')] | //a[contains(text(), 'Edit')] | //*[contains(@class, 'edit')]";
const UPDATE: &str = "//button[contains(text(), 'Update') or contains(text(), 'Save')]";
const DELETE: &str = "//button[contains(text(), 'Delete')] | //*[contains(@class, 'delete')]";
const CONFIRM: &str =
    "//button[contains(text(), 'Yes') or contains(text(), 'Confirm') or contains(text(), 'Delete')]";
const POST_ITEM: &str = ".post-item, article, .blog-card";
const SEARCH_INPUT: &str =
    "input[type='search'], input[placeholder*='search' i], input[name='search']";
const SEARCH_BUTTON: &str = "button[type='submit'], .search-button";
const SEARCH_RESULT: &str = "article, .post-card, .blog-card";

pub fn scenarios() -> Vec<Scenario<BrowserSession>> {
    vec![
        authored("posts::create", "An author can publish a post")
            .step(create_step()),
        authored("posts::view", "A post opens on its own page")
            .step(BrowserStep::soft("open a post", |s| Box::pin(view_post(s)))),
        authored("posts::edit", "An author can edit their post")
            .step(create_step())
            .step(BrowserStep::soft("edit post title", |s| Box::pin(edit_post(s)))),
        authored("posts::delete", "An author can delete their post")
            .step(create_step())
            .step(BrowserStep::soft("delete post", |s| Box::pin(delete_post(s)))),
        authored("posts::search", "Searching shows results")
            .step(BrowserStep::soft("search posts", |s| Box::pin(search(s)))),
    ]
}

fn authored(name: &str, description: &str) -> Scenario<BrowserSession> {
    Scenario::new(name)
        .describe(description)
        .tag("ui")
        .step(register_step("blogtest"))
        .step(login_step())
}

fn create_step() -> BrowserStep {
    BrowserStep::soft("create post", |s| Box::pin(create_post(s)))
}

fn short(browser: &BrowserSession) -> Wait {
    browser.wait().with_timeout(Duration::from_secs(3))
}

async fn create_post(s: &mut Browser) -> Result<()> {
    open(s, DASHBOARD_POSTS).await?;
    let clicked = {
        let browser = &*s.backend()?;
        browser
            .click_if_present(&Locator::xpath(CREATE_LINK), short(browser))
            .await?
    };
    if !clicked {
        open(s, "/create-post").await?;
    }

    let browser = &*s.backend()?;
    browser.fill(&Locator::css(TITLE_INPUT), POST_TITLE).await?;
    browser.fill(&Locator::css(CONTENT_INPUT), POST_CONTENT).await?;
    browser.click(&Locator::xpath(PUBLISH)).await?;
    browser
        .wait_for_url(|url| !url.contains("create-post"), browser.wait())
        .await?;
    Ok(())
}

async fn view_post(s: &mut Browser) -> Result<()> {
    let home = s.url("/");
    open(s, "/").await?;
    let browser = &*s.backend()?;
    browser.click(&Locator::css(POST_LINK)).await?;
    browser.wait_for_url(|url| url != home, browser.wait()).await?;
    browser
        .wait_for(&Locator::css(POST_BODY), browser.wait())
        .await?;
    Ok(())
}

async fn edit_post(s: &mut Browser) -> Result<()> {
    open(s, DASHBOARD_POSTS).await?;
    let browser = &*s.backend()?;
    browser.click(&Locator::xpath(EDIT)).await?;
    browser
        .replace(
            &Locator::css("input[name='title'], input#title"),
            &format!("{} - EDITED", POST_TITLE),
        )
        .await?;
    browser.click(&Locator::xpath(UPDATE)).await
}

async fn delete_post(s: &mut Browser) -> Result<()> {
    open(s, DASHBOARD_POSTS).await?;
    let browser = &*s.backend()?;
    let items = Locator::css(POST_ITEM);
    let before = browser.count(&items).await?;
    ensure(before > 0, "dashboard lists no posts to delete")?;

    browser.click(&Locator::xpath(DELETE)).await?;
    browser
        .click_if_present(&Locator::xpath(CONFIRM), short(browser))
        .await?;

    let items = &items;
    poll(
        || async move { Ok(browser.count(items).await? < before) },
        browser.wait(),
    )
    .await
}

async fn search(s: &mut Browser) -> Result<()> {
    open(s, "/").await?;
    let browser = &*s.backend()?;
    let input = Locator::css(SEARCH_INPUT);
    browser.clear(&input).await?;
    browser.fill(&input, "test").await?;
    if !browser
        .click_if_present(&Locator::css(SEARCH_BUTTON), short(browser))
        .await?
    {
        browser.fill(&input, "\n").await?;
    }

    let results = &Locator::css(SEARCH_RESULT);
    poll(
        || async move {
            let url = browser.current_url().await?.to_lowercase();
            Ok(url.contains("search") || browser.is_displayed(results).await?)
        },
        browser.wait(),
    )
    .await
}
