//! Commit author lookup through the GitHub REST API

use std::time::Duration;

use serde::Deserialize;

use crate::common::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// API base from `GITHUB_API_URL`, falling back to the public API
pub fn api_url() -> String {
    std::env::var("GITHUB_API_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    commit: Option<CommitDetail>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    email: Option<String>,
}

fn validate_repo(repo: &str) -> Result<()> {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(Error::Config(format!(
            "repository must look like owner/name, got '{}'",
            repo
        ))),
    }
}

/// Author email of commit `sha` in `repo`
pub async fn commit_email(api: &str, repo: &str, sha: &str) -> Result<String> {
    validate_repo(repo)?;
    if sha.trim().is_empty() {
        return Err(Error::Config("commit SHA is empty".to_string()));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::Internal(format!("HTTP client setup failed: {}", e)))?;

    let url = format!(
        "{}/repos/{}/commits/{}",
        api.trim_end_matches('/'),
        repo,
        sha
    );
    tracing::debug!(%url, "Looking up commit");

    let response = client
        .get(&url)
        .header("User-Agent", concat!("blogcheck/", env!("CARGO_PKG_VERSION")))
        .header("Accept", "application/vnd.github.v3+json")
        .send()
        .await
        .map_err(|e| Error::transport(format!("GitHub API error: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::transport(format!(
            "GitHub API returned status {}",
            response.status()
        )));
    }

    let commit: CommitResponse = response
        .json()
        .await
        .map_err(|e| Error::transport(format!("Failed to parse GitHub response: {}", e)))?;

    commit
        .commit
        .and_then(|c| c.author)
        .and_then(|a| a.email)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| Error::assertion(format!("commit {} has no author email", sha)))
}
