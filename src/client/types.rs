//! Wire types for the control plane API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page of a list response. Listings paginate via `metadata.next`, an
/// absolute URL carrying the `page_token` query parameter.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub next: Option<String>,
}

/// Per-resource metadata envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceMetadata {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A service account: the non-human principal representing a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<ResourceMetadata>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServiceAccountRequest {
    pub display_name: String,
    pub description: String,
}

/// Reference to another API resource, as embedded in API key specs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// An API key owned by a service account and bound to a cluster.
///
/// The `spec.secret` field is populated exactly once, in the creation
/// response. List and get responses omit it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub spec: ApiKeySpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySpec {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    pub owner: ObjectReference,
    #[serde(default)]
    pub resource: Option<ObjectReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateApiKeyRequest {
    pub spec: CreateApiKeySpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateApiKeySpec {
    pub display_name: String,
    pub description: String,
    pub owner: ObjectReference,
    pub resource: ObjectReference,
}

/// A role binding: a role granted to a principal over a CRN pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleBinding {
    pub id: String,
    pub principal: String,
    pub role_name: String,
    pub crn_pattern: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoleBindingRequest {
    pub principal: String,
    pub role_name: String,
    pub crn_pattern: String,
}

/// Cluster description, read only for its environment reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub spec: Option<ClusterSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub environment: Option<ObjectReference>,
}
