//! BaaS backend integration tests
//!
//! The managed backend has no server-side merge logic, so the client does
//! the metadata merging itself: fetch the profile row, shallow-merge, patch.
//! These tests pin that behavior and the auto-approved teacher application
//! over the wire.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{baas_gateway_for, healthy_baas, profile_json};
use skillversity_client::types::TeacherApplication;
use skillversity_client::Role;

#[tokio::test]
async fn test_update_metadata_merges_prior_keys() {
    let server = healthy_baas().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("u1", "student", json!({"locale": "en"}))])),
        )
        .mount(&server)
        .await;
    // The patch must carry the merged map, not just the changes.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .and(header("Prefer", "return=representation"))
        .and(header("apikey", "anon-test-key"))
        .and(body_partial_json(json!({
            "metadata": { "locale": "en", "theme": "dark" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json(
            "u1",
            "student",
            json!({"locale": "en", "theme": "dark"})
        )])))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _session) = baas_gateway_for(&server);

    let mut changes = Map::new();
    changes.insert("theme".to_string(), Value::String("dark".to_string()));
    let principal = gateway.update_metadata("u1", &changes).await.unwrap();

    assert_eq!(principal.metadata.get("theme"), Some(&json!("dark")));
    assert_eq!(principal.metadata.get("locale"), Some(&json!("en")));
}

#[tokio::test]
async fn test_update_metadata_overwrites_changed_keys() {
    let server = healthy_baas().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json(
            "u1",
            "student",
            json!({"theme": "light", "locale": "en"})
        )])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(body_partial_json(json!({
            "metadata": { "theme": "dark", "locale": "en" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json(
            "u1",
            "student",
            json!({"theme": "dark", "locale": "en"})
        )])))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _session) = baas_gateway_for(&server);

    let mut changes = Map::new();
    changes.insert("theme".to_string(), Value::String("dark".to_string()));
    let principal = gateway.update_metadata("u1", &changes).await.unwrap();

    assert_eq!(principal.metadata.get("theme"), Some(&json!("dark")));
}

#[tokio::test]
async fn test_apply_teacher_writes_role_and_keeps_metadata() {
    let server = healthy_baas().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([profile_json("u1", "student", json!({"locale": "en"}))])),
        )
        .mount(&server)
        .await;
    // Auto-approval: the role flips in the same patch that records the
    // application, and prior metadata keys survive the merge.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", "eq.u1"))
        .and(body_partial_json(json!({
            "role": "teacher",
            "metadata": {
                "locale": "en",
                "teacherApplication": {
                    "qualification": "MSc Computer Science",
                    "status": "pending"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([profile_json(
            "u1",
            "teacher",
            json!({
                "locale": "en",
                "teacherApplication": { "status": "pending" }
            })
        )])))
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _session) = baas_gateway_for(&server);

    let application = TeacherApplication {
        qualification: "MSc Computer Science".to_string(),
        experience: "8 years".to_string(),
        specialization: "Distributed systems".to_string(),
        status: "pending".to_string(),
        submitted_at: None,
    };
    let principal = gateway.apply_teacher("u1", &application).await.unwrap();

    assert_eq!(principal.role, Role::Teacher);
    assert_eq!(principal.metadata.get("locale"), Some(&json!("en")));
    assert!(principal.metadata.contains_key("teacherApplication"));
}
