#![allow(dead_code)]

use std::sync::Arc;

use account_service::{
    config::{AppConfig, JwtConfig, PasswordConfig},
    users::{MemoryUserStore, NewUser, StoreError, User, UserStore},
    AppState,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "memory://".into(),
        db_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        mode: "test".into(),
        jwt: JwtConfig {
            secret: SECRET.into(),
            issuer: "account-service".into(),
            audience: "account-service-users".into(),
            ttl_minutes: 60,
        },
        password: PasswordConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryUserStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::from_parts(Arc::new(test_config()), store.clone())
            .expect("state should build");
        let router = account_service::build_app(state.clone());
        Self {
            state,
            store,
            router,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        send_to(self.router.clone(), req).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn get_with_auth(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/users/register",
            serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/users/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }
}

/// A store whose backend is always unreachable.
pub struct FailingUserStore;

#[async_trait::async_trait]
impl UserStore for FailingUserStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn insert(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

/// State and router over [`FailingUserStore`].
pub fn failing_app() -> (AppState, Router) {
    let state = AppState::from_parts(Arc::new(test_config()), Arc::new(FailingUserStore))
        .expect("state should build");
    let router = account_service::build_app(state.clone());
    (state, router)
}

pub async fn send_to(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.oneshot(req).await.expect("router is infallible");
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token present").to_string()
}
