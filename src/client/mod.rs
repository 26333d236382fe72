//! Control plane API client
//!
//! Thin typed wrapper over the remote control plane REST API. Each method
//! maps to one endpoint and does nothing beyond request/response shaping;
//! idempotency and retry logic live in the provisioner. Authentication is
//! HTTP Basic with a cloud API key/secret pair.

mod types;

pub use types::*;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;
use url::Url;

use crate::config::ControlPlaneConfig;
use crate::error::{AppError, Result};

/// Listing page size for paginated endpoints.
const PAGE_SIZE: &str = "100";

/// Control plane API client
#[derive(Clone)]
pub struct ControlPlaneClient {
    config: ControlPlaneConfig,
    http_client: Client,
}

impl ControlPlaneClient {
    /// Create a new control plane client
    pub fn new(config: ControlPlaneConfig) -> Self {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client
            .get(format!("{}{}", self.config.base_url, path))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.config.base_url, path))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
    }

    // ============================================================================
    // Service Accounts
    // ============================================================================

    /// Find a service account by exact display name.
    ///
    /// Scans the full paginated listing and returns the first exact match.
    /// Display names are not guaranteed unique by the remote system; when
    /// duplicates exist the first one wins.
    pub async fn find_service_account_by_name(
        &self,
        name: &str,
    ) -> Result<Option<ServiceAccount>> {
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .get("/iam/v2/service-accounts")
                .query(&[("page_size", PAGE_SIZE)]);
            if let Some(ref token) = page_token {
                request = request.query(&[("page_token", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| transport_error("list service accounts", e))?;

            if !response.status().is_success() {
                return Err(error_for(response).await);
            }

            let page: Page<ServiceAccount> = response.json().await?;

            if let Some(account) = page.data.into_iter().find(|sa| sa.display_name == name) {
                return Ok(Some(account));
            }

            page_token = next_page_token(page.metadata.as_ref());
            if page_token.is_none() {
                return Ok(None);
            }
        }
    }

    /// Create a service account. Fails with `Conflict` when the remote
    /// system reports a duplicate; the caller re-resolves via find.
    pub async fn create_service_account(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ServiceAccount> {
        let request = CreateServiceAccountRequest {
            display_name: name.to_string(),
            description: description.to_string(),
        };

        let response = self
            .post("/iam/v2/service-accounts")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("create service account", e))?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        Ok(response.json().await?)
    }

    // ============================================================================
    // API Keys
    // ============================================================================

    /// Create an API key for a service account on a cluster.
    ///
    /// The returned `spec.secret` is populated only in this response and is
    /// never retrievable again.
    pub async fn create_api_key(&self, owner_id: &str, cluster_id: &str) -> Result<ApiKey> {
        let request = CreateApiKeyRequest {
            spec: CreateApiKeySpec {
                display_name: format!("API key for {owner_id}"),
                description: format!("API key for cluster {cluster_id}"),
                owner: ObjectReference {
                    id: owner_id.to_string(),
                    api_version: Some("iam/v2".to_string()),
                    kind: Some("ServiceAccount".to_string()),
                },
                resource: ObjectReference {
                    id: cluster_id.to_string(),
                    api_version: Some("cmk/v2".to_string()),
                    kind: Some("Cluster".to_string()),
                },
            },
        };

        let response = self
            .post("/iam/v2/api-keys")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("create API key", e))?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        Ok(response.json().await?)
    }

    /// Find an existing API key owned by `owner_id` and bound to
    /// `cluster_id`. The secret field is always absent on this path.
    pub async fn find_api_key_for(
        &self,
        owner_id: &str,
        cluster_id: &str,
    ) -> Result<Option<ApiKey>> {
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .get("/iam/v2/api-keys")
                .query(&[("spec.owner", owner_id), ("page_size", PAGE_SIZE)]);
            if let Some(ref token) = page_token {
                request = request.query(&[("page_token", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| transport_error("list API keys", e))?;

            if !response.status().is_success() {
                return Err(error_for(response).await);
            }

            let page: Page<ApiKey> = response.json().await?;

            if let Some(key) = page.data.into_iter().find(|key| {
                key.spec
                    .resource
                    .as_ref()
                    .is_some_and(|resource| resource.id == cluster_id)
            }) {
                return Ok(Some(key));
            }

            page_token = next_page_token(page.metadata.as_ref());
            if page_token.is_none() {
                return Ok(None);
            }
        }
    }

    // ============================================================================
    // Role Bindings
    // ============================================================================

    /// List role bindings, optionally filtered by principal server-side.
    /// Returns an empty vec (not an error) when none exist.
    pub async fn list_role_bindings(&self, principal: Option<&str>) -> Result<Vec<RoleBinding>> {
        let mut request = self
            .get("/iam/v2/role-bindings")
            .query(&[("page_size", PAGE_SIZE)]);
        if let Some(principal) = principal {
            request = request.query(&[("principal", principal)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error("list role bindings", e))?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        let page: Page<RoleBinding> = response.json().await?;
        Ok(page.data)
    }

    /// Create a role binding. Fails with `Conflict` when an identical
    /// binding exists; idempotent callers treat that as success.
    pub async fn create_role_binding(
        &self,
        principal: &str,
        role_name: &str,
        crn_pattern: &str,
    ) -> Result<RoleBinding> {
        let request = CreateRoleBindingRequest {
            principal: principal.to_string(),
            role_name: role_name.to_string(),
            crn_pattern: crn_pattern.to_string(),
        };

        let response = self
            .post("/iam/v2/role-bindings")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("create role binding", e))?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        Ok(response.json().await?)
    }

    // ============================================================================
    // Clusters
    // ============================================================================

    /// Resolve the environment a cluster lives in. Returns `Ok(None)` when
    /// the cluster is unknown or the response carries no environment
    /// reference; the caller decides how to degrade.
    pub async fn lookup_cluster_environment(&self, cluster_id: &str) -> Result<Option<String>> {
        let response = self
            .get(&format!("/cmk/v2/clusters/{cluster_id}"))
            .send()
            .await
            .map_err(|e| transport_error("get cluster", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }

        let cluster: Cluster = response.json().await?;
        let environment_id = cluster
            .spec
            .and_then(|spec| spec.environment)
            .map(|env| env.id);

        if environment_id.is_none() {
            warn!("cluster {} has no environment reference", cluster_id);
        }

        Ok(environment_id)
    }
}

/// Map a reqwest transport failure into the error taxonomy. Timeouts and
/// connection failures are `Transient`; everything else is surfaced as-is.
fn transport_error(context: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() || err.is_connect() {
        AppError::Transient(format!("{context}: {err}"))
    } else {
        AppError::Http(err)
    }
}

/// Map a non-success response into the error taxonomy, preserving the body
/// verbatim for the caller.
async fn error_for(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match status {
        StatusCode::CONFLICT => AppError::Conflict(body),
        StatusCode::FORBIDDEN => AppError::Forbidden(forbidden_hint(&body)),
        _ => AppError::Remote {
            status: status.as_u16(),
            body,
        },
    }
}

/// Turn a 403 body into an actionable message naming the privilege tier the
/// configured API key is missing.
fn forbidden_hint(body: &str) -> String {
    let tier = if body.contains("OrganizationAdmin") {
        "the API key needs the OrganizationAdmin role"
    } else if body.contains("EnvironmentAdmin") {
        "the API key needs the EnvironmentAdmin role on the target environment"
    } else {
        "the API key needs the OrganizationAdmin or EnvironmentAdmin role"
    };
    format!("{tier} ({body})")
}

/// Extract the `page_token` query parameter from a listing's `next` URL.
fn next_page_token(metadata: Option<&PageMetadata>) -> Option<String> {
    let next = metadata?.next.as_deref()?;
    if next.is_empty() {
        return None;
    }
    let url = Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page_token")
        .map(|(_, value)| value.into_owned())
}
