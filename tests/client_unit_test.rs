//! Control Plane Client Unit Tests (using WireMock)
//! These tests are fast and don't require a real control plane.

use serde_json::json;
use tenantctl::client::ControlPlaneClient;
use tenantctl::config::ControlPlaneConfig;
use tenantctl::error::AppError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(base_url: &str) -> ControlPlaneClient {
    ControlPlaneClient::new(ControlPlaneConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
        timeout_secs: 5,
    })
}

#[tokio::test]
async fn test_find_service_account_follows_pagination() {
    let mock_server = MockServer::start().await;

    // Second page, matched only when the token from page one is echoed back
    Mock::given(method("GET"))
        .and(path("/iam/v2/service-accounts"))
        .and(query_param("page_token", "tok2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "sa-222", "display_name": "acme-tenant"}
            ],
            "metadata": {}
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    // First page: no match, `next` URL carries the token for page two
    Mock::given(method("GET"))
        .and(path("/iam/v2/service-accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "sa-111", "display_name": "other-tenant"}
            ],
            "metadata": {
                "next": format!(
                    "{}/iam/v2/service-accounts?page_token=tok2",
                    mock_server.uri()
                )
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let account = client
        .find_service_account_by_name("acme-tenant")
        .await
        .unwrap();

    assert_eq!(account.unwrap().id, "sa-222");
}

#[tokio::test]
async fn test_find_service_account_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/iam/v2/service-accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "sa-1", "display_name": "someone-else"}
            ],
            "metadata": {}
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let account = client.find_service_account_by_name("ghost").await.unwrap();

    assert!(account.is_none());
}

#[tokio::test]
async fn test_create_service_account_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/iam/v2/service-accounts"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "Service name is already in use"
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client
        .create_service_account("acme-tenant", "dup")
        .await
        .unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_forbidden_names_required_role() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/iam/v2/service-accounts"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "user is missing the OrganizationAdmin role",
        ))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.create_service_account("acme", "d").await.unwrap_err();

    match err {
        AppError::Forbidden(hint) => assert!(hint.contains("OrganizationAdmin")),
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_api_key_returns_one_time_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/iam/v2/api-keys"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "ABCDEF123",
            "spec": {
                "display_name": "API key for sa-1",
                "secret": "sup3rs3cret",
                "owner": {"id": "sa-1"},
                "resource": {"id": "lkc-1"}
            }
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let key = client.create_api_key("sa-1", "lkc-1").await.unwrap();

    assert_eq!(key.id, "ABCDEF123");
    assert_eq!(key.spec.secret.as_deref(), Some("sup3rs3cret"));
}

#[tokio::test]
async fn test_find_api_key_omits_secret_and_filters_cluster() {
    let mock_server = MockServer::start().await;

    // Listing responses never carry the secret field
    Mock::given(method("GET"))
        .and(path("/iam/v2/api-keys"))
        .and(query_param("spec.owner", "sa-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "OTHERKEY",
                    "spec": {"owner": {"id": "sa-1"}, "resource": {"id": "lkc-other"}}
                },
                {
                    "id": "WANTEDKEY",
                    "spec": {"owner": {"id": "sa-1"}, "resource": {"id": "lkc-1"}}
                }
            ],
            "metadata": {}
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let key = client.find_api_key_for("sa-1", "lkc-1").await.unwrap().unwrap();

    assert_eq!(key.id, "WANTEDKEY");
    assert!(key.spec.secret.is_none());
}

#[tokio::test]
async fn test_list_role_bindings_filters_by_principal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/iam/v2/role-bindings"))
        .and(query_param("principal", "User:sa-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "rb-1",
                    "principal": "User:sa-1",
                    "role_name": "DeveloperRead",
                    "crn_pattern": "crn://confluent.cloud/organization=*/environment=env-1/cloud-cluster=lkc-1/kafka=lkc-1/topic=acme-*"
                }
            ],
            "metadata": {}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let bindings = client.list_role_bindings(Some("User:sa-1")).await.unwrap();

    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].role_name, "DeveloperRead");
}

#[tokio::test]
async fn test_lookup_cluster_environment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cmk/v2/clusters/lkc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "lkc-1",
            "spec": {
                "display_name": "prod",
                "environment": {"id": "env-abc"}
            }
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let env = client.lookup_cluster_environment("lkc-1").await.unwrap();

    assert_eq!(env.as_deref(), Some("env-abc"));
}

#[tokio::test]
async fn test_lookup_unknown_cluster_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cmk/v2/clusters/lkc-missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let env = client
        .lookup_cluster_environment("lkc-missing")
        .await
        .unwrap();

    assert!(env.is_none());
}

#[tokio::test]
async fn test_remote_error_preserves_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/iam/v2/role-bindings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal meltdown"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.list_role_bindings(None).await.unwrap_err();

    match err {
        AppError::Remote { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal meltdown");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}
