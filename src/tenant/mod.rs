//! Tenant facade
//!
//! External-facing operations composing the provisioner into single calls
//! and shaping the outcome for callers: `create_tenant`, `describe_tenant`
//! and `deprovision_tenant`.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::client::ControlPlaneClient;
use crate::error::Result;
use crate::policy::TenantPolicy;
use crate::provision::{
    normalize_display_name, BindingStatus, ProvisionRequest, Provisioner,
};

/// One binding as presented to callers.
#[derive(Debug, Clone)]
pub struct BindingView {
    pub role_name: String,
    pub crn_pattern: String,
    pub status: BindingStatus,
}

/// Flattened view of a tenant's provisioned resources.
#[derive(Debug, Clone)]
pub struct TenantSummary {
    pub tenant_name: String,
    pub display_name: String,
    pub identity_id: String,
    pub identity_existing: bool,
    /// Service account creation time, when the remote system reports it.
    pub created_at: Option<DateTime<Utc>>,
    pub credential_id: Option<String>,
    pub credential_existing: bool,
    /// One-time API secret; `None` means redacted (pre-existing credential
    /// or read-only resolution).
    pub secret: Option<String>,
    pub prefix_pattern: String,
    pub environment_id: Option<String>,
    pub bindings: Vec<BindingView>,
}

/// What a deprovision request found, and what remains to do by hand.
///
/// The control plane does not allow this tool to delete service accounts or
/// revoke keys on the automated path, so deprovisioning only enumerates the
/// tenant's resources and reports the manual console action required.
#[derive(Debug, Clone)]
pub struct DeprovisionReport {
    pub tenant_name: String,
    pub display_name: String,
    pub identity_id: Option<String>,
    pub binding_count: usize,
}

/// Tenant lifecycle facade
pub struct TenantManager {
    client: ControlPlaneClient,
    provisioner: Provisioner,
    policy: TenantPolicy,
}

impl TenantManager {
    pub fn new(client: ControlPlaneClient, policy: TenantPolicy) -> Self {
        Self {
            provisioner: Provisioner::new(client.clone()),
            client,
            policy,
        }
    }

    /// Provision a tenant end to end and flatten the result.
    ///
    /// Succeeds whenever identity and credential resolution succeed; partial
    /// binding failures are reported in the summary, not raised.
    pub async fn create_tenant(&self, request: &ProvisionRequest) -> Result<TenantSummary> {
        let outcome = self.provisioner.provision(request, &self.policy).await?;

        Ok(TenantSummary {
            tenant_name: request.tenant_name.clone(),
            display_name: outcome.display_name,
            identity_id: outcome.identity_id,
            identity_existing: outcome.identity_existing,
            created_at: outcome.identity_created_at,
            credential_id: Some(outcome.credential_id),
            credential_existing: outcome.credential_existing,
            secret: outcome.secret,
            prefix_pattern: self.policy.prefix_pattern(&request.tenant_name),
            environment_id: Some(outcome.environment_id),
            bindings: outcome
                .bindings
                .into_iter()
                .map(|b| BindingView {
                    role_name: b.role_name,
                    crn_pattern: b.crn_pattern,
                    status: b.status,
                })
                .collect(),
        })
    }

    /// Read-only view of a tenant. Returns `None` when no service account
    /// matches the tenant's display name; never creates anything.
    pub async fn describe_tenant(
        &self,
        tenant_name: &str,
        cluster_id: Option<&str>,
    ) -> Result<Option<TenantSummary>> {
        let display_name = normalize_display_name(tenant_name);

        let Some(account) = self
            .client
            .find_service_account_by_name(&display_name)
            .await?
        else {
            info!("no service account found for tenant '{tenant_name}'");
            return Ok(None);
        };

        let principal = format!("User:{}", account.id);
        let prefix_pattern = self.policy.prefix_pattern(tenant_name);
        let needle = prefix_pattern.trim_end_matches('*');

        let mut bindings = self.client.list_role_bindings(Some(&principal)).await?;
        if !needle.is_empty() {
            bindings.retain(|b| prefix_scoped(&b.crn_pattern, needle));
        }

        let (credential_id, credential_existing) = match cluster_id {
            Some(cluster_id) => {
                match self.client.find_api_key_for(&account.id, cluster_id).await? {
                    Some(key) => (Some(key.id), true),
                    None => (None, false),
                }
            }
            None => (None, false),
        };

        Ok(Some(TenantSummary {
            tenant_name: tenant_name.to_string(),
            display_name,
            created_at: account.metadata.as_ref().and_then(|m| m.created_at),
            identity_id: account.id,
            identity_existing: true,
            credential_id,
            credential_existing,
            secret: None,
            prefix_pattern,
            environment_id: None,
            bindings: bindings
                .into_iter()
                .map(|b| BindingView {
                    role_name: b.role_name,
                    crn_pattern: b.crn_pattern,
                    status: BindingStatus::AlreadyExists,
                })
                .collect(),
        }))
    }

    /// Enumerate a tenant's resources for deprovisioning. The automated
    /// path never deletes anything; the report tells the operator what to
    /// remove in the console.
    pub async fn deprovision_tenant(&self, tenant_name: &str) -> Result<DeprovisionReport> {
        let display_name = normalize_display_name(tenant_name);

        let Some(account) = self
            .client
            .find_service_account_by_name(&display_name)
            .await?
        else {
            warn!("no service account found for tenant '{tenant_name}'");
            return Ok(DeprovisionReport {
                tenant_name: tenant_name.to_string(),
                display_name,
                identity_id: None,
                binding_count: 0,
            });
        };

        let principal = format!("User:{}", account.id);
        let bindings = self.client.list_role_bindings(Some(&principal)).await?;

        Ok(DeprovisionReport {
            tenant_name: tenant_name.to_string(),
            display_name,
            identity_id: Some(account.id),
            binding_count: bindings.len(),
        })
    }
}

/// Whether a binding CRN's trailing resource pattern starts with the tenant
/// prefix. The prefix must anchor the pattern segment itself; a substring hit
/// elsewhere in the CRN does not count.
fn prefix_scoped(crn_pattern: &str, needle: &str) -> bool {
    crn_pattern
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split_once('='))
        .is_some_and(|(_, pattern)| pattern.starts_with(needle))
}
