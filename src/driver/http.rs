//! Plain HTTP sessions
//!
//! A cookie-keeping `reqwest` client bound to the application's base URL.
//! Requests never retry on their own; waiting for a state change is done
//! with the poller.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::common::{Error, Result, SessionOptions};
use crate::engine::{Backend, Wait};

/// A response captured in full
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub elapsed: Duration,
}

impl HttpResponse {
    /// Fail unless the status is one of `allowed`
    pub fn expect_status(&self, allowed: &[u16]) -> Result<&Self> {
        if allowed.contains(&self.status) {
            Ok(self)
        } else {
            Err(Error::assertion(format!(
                "{} {} returned {}, expected one of {:?}: {}",
                self.method,
                self.url,
                self.status,
                allowed,
                truncate(&self.body, 200)
            )))
        }
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
            || self.body.trim_start().starts_with('{')
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::assertion(format!(
                "{} {} did not return valid JSON: {}",
                self.method, self.url, e
            ))
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// An HTTP client session against the application
pub struct HttpSession {
    client: Option<reqwest::Client>,
    base_url: String,
    wait: Wait,
}

#[async_trait]
impl Backend for HttpSession {
    fn kind() -> &'static str {
        "http"
    }

    async fn open(options: &SessionOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(options.request_timeout)
            .user_agent(concat!("blogcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Acquisition(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client: Some(client),
            base_url: options.base_url.trim_end_matches('/').to_string(),
            wait: Wait::from_options(options),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.client.take();
        Ok(())
    }
}

impl HttpSession {
    fn client(&self) -> Result<&reqwest::Client> {
        self.client.as_ref().ok_or(Error::SessionReleased)
    }

    pub fn wait(&self) -> Wait {
        self.wait
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Resolve `path` under the `/api` prefix
    pub fn api(&self, path: &str) -> String {
        self.url(&format!("/api/{}", path.trim_start_matches('/')))
    }

    /// Send a request and read the whole body
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse> {
        let mut builder = self.client()?.request(method.clone(), url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| request_error(&method, url, e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| request_error(&method, url, e))?;
        let elapsed = start.elapsed();

        tracing::debug!(%method, url, status, elapsed_ms = elapsed.as_millis() as u64, "HTTP request");
        Ok(HttpResponse {
            method,
            url: url.to_string(),
            status,
            content_type,
            body,
            elapsed,
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::POST, url, None).await
    }

    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        self.request(Method::POST, url, Some(body)).await
    }

    pub async fn options(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::OPTIONS, url, None).await
    }
}

fn request_error(method: &Method, url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(0, Some(format!("{} {} timed out", method, url)))
    } else {
        Error::transport(format!("{} {}: {}", method, url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, HttpSession) {
        let server = MockServer::start().await;
        let session = HttpSession::open(&SessionOptions::new(server.uri())).await.unwrap();
        (server, session)
    }

    #[tokio::test]
    async fn test_get_captures_status_and_body() {
        let (server, session) = setup().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<!doctype html><html></html>"))
            .mount(&server)
            .await;

        let response = session.get(&session.url("/")).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<html>"));
        assert!(response.expect_status(&[200, 304]).is_ok());
        assert!(response.expect_status(&[201]).is_err());
    }

    #[tokio::test]
    async fn test_post_json_sends_body() {
        let (server, session) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .and(body_json(json!({"email": "a@b.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "42"})))
            .mount(&server)
            .await;

        let response = session
            .post_json(&session.api("user/login"), &json!({"email": "a@b.com", "password": "pw"}))
            .await
            .unwrap();
        assert!(response.is_json());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["_id"], "42");
    }

    #[tokio::test]
    async fn test_cookies_are_kept() {
        let (server, session) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "access_token=abc; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/getusers"))
            .and(wiremock::matchers::header("cookie", "access_token=abc"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        session.post(&session.api("user/login")).await.unwrap();
        let response = session.get(&session.api("/user/getusers")).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let mut session = HttpSession::open(&SessionOptions::new("http://127.0.0.1:9"))
            .await
            .unwrap();
        let result = session.get(&session.url("/")).await;
        assert!(matches!(result, Err(Error::Transport(_))));

        session.close().await.unwrap();
        assert!(matches!(session.get("http://127.0.0.1:9/").await, Err(Error::SessionReleased)));
    }

    #[test]
    fn test_api_paths() {
        let session = HttpSession {
            client: None,
            base_url: "http://localhost:8081".to_string(),
            wait: Wait::default(),
        };
        assert_eq!(session.api("user/login"), "http://localhost:8081/api/user/login");
        assert_eq!(session.api("/user/login"), "http://localhost:8081/api/user/login");
        assert_eq!(session.url("sign-in"), "http://localhost:8081/sign-in");
    }
}
