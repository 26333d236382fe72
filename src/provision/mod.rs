//! Idempotent tenant provisioning workflow
//!
//! The provisioner drives the control plane client through find-or-create
//! resolution of the tenant's service account, API key, and role bindings.
//! Identity and credential resolution are hard failures that abort the run;
//! individual binding failures are collected and reported, never raised.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::client::{ControlPlaneClient, ServiceAccount};
use crate::crn::{build_crn, ResourceKind, WILDCARD};
use crate::error::{AppError, Result};
use crate::policy::{PolicyEntry, TenantPolicy};

/// Maximum display-name length accepted by the control plane.
pub const DISPLAY_NAME_MAX_LEN: usize = 64;

/// Marker prepended when a normalized name would not start with a letter.
const NON_LETTER_MARKER: &str = "t-";

/// Extra attempts for read-only calls that fail transiently.
const READ_RETRIES: u32 = 2;
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Inputs for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub tenant_name: String,
    pub cluster_id: String,
    pub environment_id: Option<String>,
    pub organization_id: Option<String>,
}

/// Result of applying a single policy entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingStatus {
    Created,
    AlreadyExists,
    /// Error detail preserved verbatim for the caller.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BindingOutcome {
    pub role_name: String,
    pub kind: ResourceKind,
    pub crn_pattern: String,
    pub status: BindingStatus,
}

/// Aggregated outcome of one provisioning run. Returned whenever identity
/// and credential resolution succeed, regardless of binding failures.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub display_name: String,
    pub identity_id: String,
    pub identity_existing: bool,
    /// When the remote system reports it, the service account's creation
    /// timestamp.
    pub identity_created_at: Option<DateTime<Utc>>,
    pub credential_id: String,
    pub credential_existing: bool,
    /// One-time API secret. `None` when the credential pre-existed, since
    /// the remote system never returns a secret twice.
    pub secret: Option<String>,
    pub environment_id: String,
    pub bindings: Vec<BindingOutcome>,
}

impl ProvisionOutcome {
    pub fn created_count(&self) -> usize {
        self.count(|s| *s == BindingStatus::Created)
    }

    pub fn already_exists_count(&self) -> usize {
        self.count(|s| *s == BindingStatus::AlreadyExists)
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, BindingStatus::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&BindingStatus) -> bool) -> usize {
        self.bindings
            .iter()
            .filter(|b| predicate(&b.status))
            .count()
    }
}

/// Normalize a tenant name into a valid service account display name.
///
/// Deterministic, since the result is the lookup key for all future
/// idempotent runs: characters outside `[A-Za-z0-9-]` become `-`, a name
/// not starting with a letter gets the `t-` marker prepended, and the
/// result is truncated to 64 characters.
pub fn normalize_display_name(tenant_name: &str) -> String {
    let mut name: String = tenant_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();

    if !name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
    {
        name.insert_str(0, NON_LETTER_MARKER);
    }

    name.truncate(DISPLAY_NAME_MAX_LEN);
    name
}

/// Idempotent provisioner
pub struct Provisioner {
    client: ControlPlaneClient,
}

impl Provisioner {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    /// Run the full provisioning workflow for one tenant.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
        policy: &TenantPolicy,
    ) -> Result<ProvisionOutcome> {
        let display_name = normalize_display_name(&request.tenant_name);
        info!(
            "provisioning tenant '{}' as '{}' on cluster {}",
            request.tenant_name, display_name, request.cluster_id
        );

        let (identity, identity_existing) = self
            .resolve_identity(&request.tenant_name, &display_name)
            .await?;
        let identity_created_at = identity.metadata.as_ref().and_then(|m| m.created_at);
        let environment_id = self.resolve_environment(request, policy).await?;
        let (credential_id, secret, credential_existing) = self
            .resolve_credential(&identity.id, &request.cluster_id)
            .await?;

        let organization_id = request.organization_id.as_deref().unwrap_or(WILDCARD);
        let principal = format!("User:{}", identity.id);

        let mut bindings = Vec::with_capacity(policy.entries.len());
        for entry in &policy.entries {
            let pattern = entry.resolve_pattern(&request.tenant_name);
            let outcome = self
                .apply_binding(
                    &principal,
                    entry,
                    organization_id,
                    &environment_id,
                    &request.cluster_id,
                    &pattern,
                )
                .await;
            bindings.push(outcome);
        }

        let outcome = ProvisionOutcome {
            display_name,
            identity_id: identity.id,
            identity_existing,
            identity_created_at,
            credential_id,
            credential_existing,
            secret,
            environment_id,
            bindings,
        };

        info!(
            "bindings for '{}': {} created, {} already existed, {} failed",
            request.tenant_name,
            outcome.created_count(),
            outcome.already_exists_count(),
            outcome.failed_count()
        );

        Ok(outcome)
    }

    /// Find or create the tenant's service account. A `Conflict` on create
    /// means a remote-side race; re-resolve once before giving up.
    async fn resolve_identity(
        &self,
        tenant_name: &str,
        display_name: &str,
    ) -> Result<(ServiceAccount, bool)> {
        if let Some(account) = retry_read("service account lookup", || {
            self.client.find_service_account_by_name(display_name)
        })
        .await?
        {
            info!("reusing existing service account {}", account.id);
            return Ok((account, true));
        }

        let description = format!("Service account for tenant {tenant_name}");
        match self
            .client
            .create_service_account(display_name, &description)
            .await
        {
            Ok(account) => {
                info!("created service account {}", account.id);
                Ok((account, false))
            }
            Err(err) if err.is_conflict() => {
                match self.client.find_service_account_by_name(display_name).await? {
                    Some(account) => {
                        info!("service account {} created concurrently", account.id);
                        Ok((account, true))
                    }
                    None => Err(AppError::IdentityResolutionFailed {
                        tenant: tenant_name.to_string(),
                        detail: "create reported a duplicate but no account is listed"
                            .to_string(),
                    }),
                }
            }
            Err(err) => Err(AppError::IdentityResolutionFailed {
                tenant: tenant_name.to_string(),
                detail: err.to_string(),
            }),
        }
    }

    /// Use the supplied environment, else ask the cluster. A missing
    /// environment degrades to `*` only when the policy allows it.
    async fn resolve_environment(
        &self,
        request: &ProvisionRequest,
        policy: &TenantPolicy,
    ) -> Result<String> {
        if let Some(environment_id) = &request.environment_id {
            return Ok(environment_id.clone());
        }

        match retry_read("cluster environment lookup", || {
            self.client.lookup_cluster_environment(&request.cluster_id)
        })
        .await?
        {
            Some(environment_id) => {
                info!(
                    "resolved environment {} from cluster {}",
                    environment_id, request.cluster_id
                );
                Ok(environment_id)
            }
            None if policy.allow_wildcard_environment => {
                warn!(
                    "could not determine the environment for cluster {}; \
                     proceeding with environment=*",
                    request.cluster_id
                );
                Ok(WILDCARD.to_string())
            }
            None => Err(AppError::EnvironmentRequired),
        }
    }

    /// Find or create the tenant's API key. An existing key is a valid
    /// terminal state even though its secret cannot be read back.
    async fn resolve_credential(
        &self,
        owner_id: &str,
        cluster_id: &str,
    ) -> Result<(String, Option<String>, bool)> {
        if let Some(key) = retry_read("API key lookup", || {
            self.client.find_api_key_for(owner_id, cluster_id)
        })
        .await?
        {
            info!("reusing existing API key {} (secret not retrievable)", key.id);
            return Ok((key.id, None, true));
        }

        let key = self.client.create_api_key(owner_id, cluster_id).await?;
        info!("created API key {}", key.id);
        let secret = key.spec.secret.clone();
        Ok((key.id, secret, false))
    }

    async fn apply_binding(
        &self,
        principal: &str,
        entry: &PolicyEntry,
        organization_id: &str,
        environment_id: &str,
        cluster_id: &str,
        pattern: &str,
    ) -> BindingOutcome {
        let crn = match build_crn(
            entry.kind,
            organization_id,
            environment_id,
            cluster_id,
            pattern,
        ) {
            Ok(crn) => crn,
            Err(err) => {
                warn!(
                    "skipping {} on {}:{}: {}",
                    entry.role_name, entry.kind, pattern, err
                );
                return BindingOutcome {
                    role_name: entry.role_name.clone(),
                    kind: entry.kind,
                    crn_pattern: pattern.to_string(),
                    status: BindingStatus::Failed(err.to_string()),
                };
            }
        };

        let status = match self
            .client
            .create_role_binding(principal, &entry.role_name, &crn)
            .await
        {
            Ok(binding) => {
                info!(
                    "created role binding {}: {} on {}",
                    binding.id, entry.role_name, crn
                );
                BindingStatus::Created
            }
            Err(err) if err.is_conflict() => {
                info!("role binding {} on {} already exists", entry.role_name, crn);
                BindingStatus::AlreadyExists
            }
            Err(err) => {
                warn!(
                    "failed to create role binding {} on {}: {}",
                    entry.role_name, crn, err
                );
                BindingStatus::Failed(err.to_string())
            }
        };

        BindingOutcome {
            role_name: entry.role_name.clone(),
            kind: entry.kind,
            crn_pattern: crn,
            status,
        }
    }
}

/// Retry a read-only call a bounded number of times on transient failures,
/// with linear backoff. Create calls are never routed through here: the
/// remote conflict detection is the only duplicate protection we rely on.
async fn retry_read<T, F, Fut>(operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Err(AppError::Transient(detail)) if attempt < READ_RETRIES => {
                attempt += 1;
                warn!("{operation} failed transiently (attempt {attempt}): {detail}");
                tokio::time::sleep(Duration::from_millis(
                    RETRY_BASE_DELAY_MS * u64::from(attempt),
                ))
                .await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_invalid_chars() {
        let name = normalize_display_name("My Project!!");
        assert_eq!(name, "My-Project--");
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn test_normalize_prepends_marker_for_non_letter_start() {
        assert_eq!(normalize_display_name("123abc"), "t-123abc");
        assert_eq!(normalize_display_name("-edge"), "t--edge");
    }

    #[test]
    fn test_normalize_truncates_to_max_len() {
        let long = "a".repeat(100);
        assert_eq!(normalize_display_name(&long).len(), DISPLAY_NAME_MAX_LEN);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        assert_eq!(
            normalize_display_name("org.entity.factory1"),
            normalize_display_name("org.entity.factory1")
        );
        assert_eq!(
            normalize_display_name("org.entity.factory1"),
            "org-entity-factory1"
        );
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize_display_name(""), "t-");
    }

    #[test]
    fn test_outcome_counts() {
        let outcome = ProvisionOutcome {
            display_name: "acme".to_string(),
            identity_id: "sa-1".to_string(),
            identity_existing: false,
            identity_created_at: None,
            credential_id: "key-1".to_string(),
            credential_existing: false,
            secret: Some("s".to_string()),
            environment_id: "env-1".to_string(),
            bindings: vec![
                BindingOutcome {
                    role_name: "DeveloperRead".to_string(),
                    kind: ResourceKind::Topic,
                    crn_pattern: "crn".to_string(),
                    status: BindingStatus::Created,
                },
                BindingOutcome {
                    role_name: "DeveloperWrite".to_string(),
                    kind: ResourceKind::Topic,
                    crn_pattern: "crn".to_string(),
                    status: BindingStatus::AlreadyExists,
                },
                BindingOutcome {
                    role_name: "DeveloperRead".to_string(),
                    kind: ResourceKind::ConsumerGroup,
                    crn_pattern: "crn".to_string(),
                    status: BindingStatus::Failed("boom".to_string()),
                },
            ],
        };

        assert_eq!(outcome.created_count(), 1);
        assert_eq!(outcome.already_exists_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
    }
}
