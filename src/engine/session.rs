//! Session lifecycle
//!
//! A [`Session`] exclusively owns one remote driving channel (a browser
//! session or an HTTP client). It is released exactly once; releasing again
//! is a no-op and any use after release fails with
//! [`Error::SessionReleased`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::common::{Error, Result, SessionOptions};

/// A remote channel that a session can drive
#[async_trait]
pub trait Backend: Send + Sized + 'static {
    /// Short name used in session ids and logs ("browser", "http")
    fn kind() -> &'static str;

    /// Open the channel. Must not leak the underlying process or
    /// connection when it fails part way.
    async fn open(options: &SessionOptions) -> Result<Self>;

    /// Close the channel
    async fn close(&mut self) -> Result<()>;
}

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Exclusively-owned handle to a remote channel
pub struct Session<B: Backend> {
    id: String,
    created_at: SystemTime,
    options: SessionOptions,
    backend: Option<B>,
    /// Values steps hand forward to later steps (credentials, tokens)
    vars: HashMap<String, String>,
}

impl<B: Backend> Session<B> {
    /// Acquire a session, bounded by `options.timeout_ms`
    ///
    /// Every failure, including invalid options, is an acquisition failure.
    pub async fn acquire(options: &SessionOptions) -> Result<Self> {
        options
            .validate()
            .map_err(|e| Error::Acquisition(e.to_string()))?;

        let limit = Duration::from_millis(options.timeout_ms);
        let backend = match tokio::time::timeout(limit, B::open(options)).await {
            Ok(Ok(backend)) => backend,
            Ok(Err(Error::Acquisition(reason))) => return Err(Error::Acquisition(reason)),
            Ok(Err(e)) => return Err(Error::Acquisition(e.to_string())),
            Err(_) => {
                return Err(Error::Acquisition(format!(
                    "{} session not ready after {} ms",
                    B::kind(),
                    options.timeout_ms
                )))
            }
        };

        let id = format!(
            "{}-{}-{}",
            B::kind(),
            std::process::id(),
            NEXT_SESSION.fetch_add(1, Ordering::Relaxed)
        );
        tracing::debug!(session = %id, base_url = %options.base_url, "Session acquired");

        Ok(Self {
            id,
            created_at: SystemTime::now(),
            options: options.clone(),
            backend: Some(backend),
            vars: HashMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn is_alive(&self) -> bool {
        self.backend.is_some()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Resolve a path against the session's base URL
    pub fn url(&self, path: &str) -> String {
        self.options.url(path)
    }

    /// The live backend
    pub fn backend(&mut self) -> Result<&mut B> {
        self.backend.as_mut().ok_or(Error::SessionReleased)
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Like [`Session::var`] but a missing value is an assertion failure
    pub fn require_var(&self, key: &str) -> Result<String> {
        self.var(key)
            .map(str::to_string)
            .ok_or_else(|| Error::assertion(format!("no '{}' recorded by an earlier step", key)))
    }

    /// Release the session. Idempotent; close errors are logged only.
    pub async fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            match backend.close().await {
                Ok(()) => tracing::debug!(session = %self.id, "Session released"),
                Err(e) => tracing::warn!(session = %self.id, error = %e, "Error closing session"),
            }
        }
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        if self.backend.is_some() {
            tracing::warn!(
                session = %self.id,
                "Session dropped without release; leaving cleanup to the backend"
            );
        }
    }
}

/// Scoped acquisition: acquire, run `f`, release on every return path
pub async fn with_session<B, T, F>(options: &SessionOptions, f: F) -> Result<T>
where
    B: Backend,
    F: for<'a> FnOnce(&'a mut Session<B>) -> BoxFuture<'a, T>,
{
    let mut session = Session::<B>::acquire(options).await?;
    let out = f(&mut session).await;
    session.release().await;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{closes, opens, FakeBackend};

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let options = SessionOptions::new("http://fake/release-twice");
        let mut session = Session::<FakeBackend>::acquire(&options).await.unwrap();
        assert!(session.is_alive());
        assert!(session.id().starts_with("fake-"));
        assert!(session.created_at() <= SystemTime::now());

        session.release().await;
        session.release().await;

        assert!(!session.is_alive());
        assert_eq!(closes("http://fake/release-twice"), 1);
    }

    #[tokio::test]
    async fn test_use_after_release_fails() {
        let options = SessionOptions::new("http://fake/use-after");
        let mut session = Session::<FakeBackend>::acquire(&options).await.unwrap();
        session.release().await;
        assert!(matches!(session.backend(), Err(Error::SessionReleased)));
    }

    #[tokio::test]
    async fn test_open_failure_is_acquisition_error() {
        let options = SessionOptions::new("http://fake/refuse-open");
        let result = Session::<FakeBackend>::acquire(&options).await;
        assert!(matches!(result, Err(Error::Acquisition(_))));
        assert_eq!(closes("http://fake/refuse-open"), 0);
    }

    #[tokio::test]
    async fn test_invalid_options_never_open() {
        let options = SessionOptions::new("not-a-url");
        let result = Session::<FakeBackend>::acquire(&options).await;
        assert!(matches!(result, Err(Error::Acquisition(_))));
        assert_eq!(opens("not-a-url"), 0);
    }

    #[tokio::test]
    async fn test_slow_open_is_bounded() {
        let mut options = SessionOptions::new("http://fake/slow-open");
        options.timeout_ms = 50;
        let start = std::time::Instant::now();
        let result = Session::<FakeBackend>::acquire(&options).await;
        assert!(matches!(result, Err(Error::Acquisition(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_with_session_releases_once() {
        let options = SessionOptions::new("http://fake/scoped");
        let out = with_session::<FakeBackend, _, _>(&options, |session| {
            Box::pin(async move {
                session.set_var("token", "abc");
                session.require_var("token")
            })
        })
        .await
        .unwrap();

        assert_eq!(out.unwrap(), "abc");
        assert_eq!(closes("http://fake/scoped"), 1);
    }

    #[tokio::test]
    async fn test_with_session_releases_when_body_fails() {
        let options = SessionOptions::new("http://fake/scoped-error");
        let out = with_session::<FakeBackend, _, _>(&options, |session| {
            Box::pin(async move { session.require_var("missing") })
        })
        .await
        .unwrap();

        assert!(matches!(out, Err(Error::Assertion(_))));
        assert_eq!(closes("http://fake/scoped-error"), 1);
    }
}
