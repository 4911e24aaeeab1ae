#![allow(dead_code)]

pub mod pg;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use marketplace::{
    app::build_app,
    auth::services::seed_admin,
    config::AdminSeed,
    state::AppState,
};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "Passw0rd!";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _uploads: TempDir,
}

pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("tempdir");
        let state = AppState::in_memory(uploads.path());
        let router = build_app(state.clone());
        Self {
            state,
            router,
            _uploads: uploads,
        }
    }

    pub async fn raw(&self, method: Method, path: &str, token: Option<&str>, body: Option<String>) -> RawResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };
        let res = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = res.status();
        let headers = res.headers().clone();
        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body").to_vec();
        RawResponse { status, headers, body }
    }

    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let res = self
            .raw(method, path, token, body.map(|b| b.to_string()))
            .await;
        let json = serde_json::from_slice(&res.body).unwrap_or(JsonValue::Null);
        (res.status, json)
    }

    pub async fn register(&self, email: &str, role: &str) {
        let (status, body) = self
            .call(
                Method::POST,
                "/register",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                    "name": "Test",
                    "surname": "User",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {email}: {body}");
        body["access_token"].as_str().expect("access token").to_string()
    }

    /// Registers and logs in, returning the access token.
    pub async fn signup(&self, email: &str, role: &str) -> String {
        self.register(email, role).await;
        self.login(email).await
    }

    pub async fn admin(&self) -> String {
        let seed = AdminSeed {
            email: "admin@x.com".into(),
            password: PASSWORD.into(),
            name: "Admin".into(),
            surname: "Admin".into(),
        };
        seed_admin(self.state.store.as_ref(), &seed).await.expect("seed admin");
        self.login("admin@x.com").await
    }

    pub async fn create_job(&self, token: &str, title: &str) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/jobs",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "Build a landing page",
                    "type": "one-time",
                    "rate": "fixed",
                    "amount": 500,
                    "length": "1-3",
                    "hours_per_week": "10-20",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create job: {body}");
        body["id"].as_i64().expect("job id")
    }

    pub async fn apply(&self, token: &str, job_id: i64, file: Option<(&str, &str)>) -> (StatusCode, JsonValue) {
        let mut payload = json!({ "job_id": job_id, "description": "I can do this" });
        if let Some((name, b64)) = file {
            payload["file_name"] = json!(name);
            payload["file_base64"] = json!(b64);
        }
        self.call(Method::POST, "/user/freelancer/applications", Some(token), Some(payload))
            .await
    }
}
