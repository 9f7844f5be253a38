//! Admin-only API access

use serde_json::{json, Value};

use crate::common::config::AdminConfig;
use crate::common::Result;
use crate::driver::HttpSession;
use crate::engine::{Scenario, Session, Step};

const SKIP_REASON: &str = "admin tests disabled (SKIP_ADMIN_TESTS)";

pub fn users(admin: &AdminConfig, skip: bool) -> Scenario<HttpSession> {
    let email = admin.email.clone();
    let password = admin.password.clone();

    Scenario::new("admin::users")
        .describe("The admin account can list users")
        .tag("admin")
        .tag("api")
        .step(
            Step::<HttpSession>::hard("admin login", move |s| {
                let body = json!({ "email": email, "password": password });
                Box::pin(admin_login(s, body))
            })
            .skip_if(skip, SKIP_REASON),
        )
        .step(
            Step::<HttpSession>::hard("list users", |s| Box::pin(list_users(s)))
                .skip_if(skip, SKIP_REASON),
        )
}

async fn admin_login(s: &mut Session<HttpSession>, body: Value) -> Result<()> {
    let http = &*s.backend()?;
    http.post_json(&http.api("user/login"), &body)
        .await?
        .expect_status(&[200])?;
    Ok(())
}

async fn list_users(s: &mut Session<HttpSession>) -> Result<()> {
    let http = &*s.backend()?;
    let response = http.get(&http.api("user/getusers")).await?;
    response.expect_status(&[200])?;
    let _: Value = response.json()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SessionOptions;
    use crate::engine::{RunState, ScenarioRunner, StepOutcome};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn admin() -> AdminConfig {
        AdminConfig {
            email: "root@blog.com".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_admin_lists_users_with_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .and(body_partial_json(json!({"email": "root@blog.com", "password": "s3cret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "access_token=admin; Path=/")
                    .set_body_json(json!({"_id": "a1", "isAdmin": true})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/user/getusers"))
            .and(header("cookie", "access_token=admin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": [], "totalUsers": 0})))
            .mount(&server)
            .await;

        let summary = ScenarioRunner::new()
            .execute(&users(&admin(), false), &SessionOptions::new(server.uri()))
            .await;
        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(summary.passed(), 2, "{:?}", summary.entries());
    }

    #[tokio::test]
    async fn test_skipped_when_disabled() {
        let server = MockServer::start().await;
        let summary = ScenarioRunner::new()
            .execute(&users(&admin(), true), &SessionOptions::new(server.uri()))
            .await;
        assert_eq!(summary.state(), RunState::Completed);
        assert_eq!(summary.skipped(), 2);
        assert!(summary
            .entries()
            .iter()
            .all(|e| *e.outcome() == StepOutcome::Skipped));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_admin_login_fails_hard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let summary = ScenarioRunner::new()
            .execute(&users(&admin(), false), &SessionOptions::new(server.uri()))
            .await;
        assert_eq!(summary.state(), RunState::Aborted);
        assert_eq!(summary.entries().len(), 1);
    }
}
