//! Shared fixtures for integration tests
//!
//! Spins up a wiremock server standing in for the REST backend and wires a
//! gateway (and optionally an orchestrator) against it.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skillversity_client::auth::AuthOrchestrator;
use skillversity_client::{BackendStrategy, ClientConfig, Gateway, SessionStore};

/// Start a mock backend whose health check succeeds.
pub async fn healthy_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health-check"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    server
}

/// Build a REST gateway against the given mock server.
pub fn gateway_for(server: &MockServer) -> (Arc<Gateway>, SessionStore) {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .request_timeout(Duration::from_secs(2))
        .health_timeout(Duration::from_secs(1))
        .build()
        .expect("test config is valid");
    let session = SessionStore::new();
    let gateway = Arc::new(Gateway::new(&config, session.clone()).expect("gateway builds"));
    (gateway, session)
}

/// Start a mock BaaS whose health check succeeds.
pub async fn healthy_baas() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    server
}

/// Build a BaaS gateway against the given mock server.
pub fn baas_gateway_for(server: &MockServer) -> (Arc<Gateway>, SessionStore) {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .backend(BackendStrategy::Baas)
        .anon_key("anon-test-key")
        .request_timeout(Duration::from_secs(2))
        .health_timeout(Duration::from_secs(1))
        .build()
        .expect("test config is valid");
    let session = SessionStore::new();
    let gateway = Arc::new(Gateway::new(&config, session.clone()).expect("gateway builds"));
    (gateway, session)
}

/// A `profiles` table row in the BaaS wire shape.
pub fn profile_json(id: &str, role: &str, metadata: Value) -> Value {
    json!({
        "id": id,
        "email": "ada@example.com",
        "username": "ada",
        "role": role,
        "created_at": "2024-01-01T00:00:00+00:00",
        "metadata": metadata
    })
}

/// Build an orchestrator on top of a fresh gateway.
pub fn orchestrator_for(server: &MockServer) -> (Arc<AuthOrchestrator>, SessionStore) {
    let (gateway, session) = gateway_for(server);
    (
        Arc::new(AuthOrchestrator::new(gateway, session.clone())),
        session,
    )
}

/// A minimal course payload in the REST wire shape.
pub fn course_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "author": "Dr. Sarah Johnson",
        "image": "https://example.com/cover.jpg",
        "rating": 4.8,
        "duration": "8 weeks",
        "price": "₦15,000",
        "category": "Data Science",
        "createdAt": "2024-01-02T10:00:00",
        "viewCount": 1250,
        "enrollmentCount": 320,
        "popularityScore": 95
    })
}

/// A principal payload in the REST wire shape.
pub fn user_json(id: &str, email: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "username": "learner",
        "role": role,
        "created_at": "2024-01-01T00:00:00"
    })
}
