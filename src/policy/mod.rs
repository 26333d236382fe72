//! Tenant permission policy
//!
//! A policy is the ordered set of role bindings a tenant receives, expressed
//! as `(role, resource kind, pattern template)` tuples. Templates carry the
//! `{tenant}` placeholder; the prefix convention (`{tenant}-*`, `{tenant}.*`,
//! ...) is a configuration choice, not a constant.

use serde::{Deserialize, Serialize};

use crate::crn::ResourceKind;

/// Placeholder substituted with the tenant name in pattern templates.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// One entry of a tenant policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub role_name: String,
    pub kind: ResourceKind,
    /// Resource pattern template; empty for cluster-wide grants.
    pub pattern_template: String,
}

impl PolicyEntry {
    pub fn new(
        role_name: impl Into<String>,
        kind: ResourceKind,
        pattern_template: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            kind,
            pattern_template: pattern_template.into(),
        }
    }

    /// Substitute the tenant name into this entry's pattern template.
    pub fn resolve_pattern(&self, tenant_name: &str) -> String {
        substitute(&self.pattern_template, tenant_name)
    }
}

/// The ordered set of permissions defining what a tenant may do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantPolicy {
    /// Prefix pattern template for the tenant's namespace, e.g. `{tenant}-*`.
    pub prefix_template: String,
    /// Bindings to apply, in declared order.
    pub entries: Vec<PolicyEntry>,
    /// Whether provisioning may proceed with environment `*` when the
    /// cluster lookup cannot determine the environment.
    #[serde(default)]
    pub allow_wildcard_environment: bool,
}

impl TenantPolicy {
    /// Standard prefix-isolation policy: developer read/write on topics and
    /// consumer groups under the tenant prefix, read on the cluster itself,
    /// and read/write on schema subjects under the prefix.
    pub fn prefix_isolation(prefix_template: impl Into<String>) -> Self {
        let prefix = prefix_template.into();
        let entries = vec![
            PolicyEntry::new("DeveloperRead", ResourceKind::Topic, prefix.clone()),
            PolicyEntry::new("DeveloperWrite", ResourceKind::Topic, prefix.clone()),
            PolicyEntry::new("DeveloperRead", ResourceKind::ConsumerGroup, prefix.clone()),
            PolicyEntry::new("DeveloperWrite", ResourceKind::ConsumerGroup, prefix.clone()),
            PolicyEntry::new("DeveloperRead", ResourceKind::KafkaCluster, ""),
            PolicyEntry::new("DeveloperRead", ResourceKind::SchemaSubject, prefix.clone()),
            PolicyEntry::new("DeveloperWrite", ResourceKind::SchemaSubject, prefix.clone()),
        ];
        Self {
            prefix_template: prefix,
            entries,
            allow_wildcard_environment: false,
        }
    }

    /// The tenant's resolved namespace prefix pattern.
    pub fn prefix_pattern(&self, tenant_name: &str) -> String {
        substitute(&self.prefix_template, tenant_name)
    }
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self::prefix_isolation("{tenant}-*")
    }
}

fn substitute(template: &str, tenant_name: &str) -> String {
    template.replace(TENANT_PLACEHOLDER, tenant_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pattern() {
        let entry = PolicyEntry::new("DeveloperRead", ResourceKind::Topic, "{tenant}-*");
        assert_eq!(entry.resolve_pattern("acme"), "acme-*");
    }

    #[test]
    fn test_resolve_pattern_dot_convention() {
        let entry = PolicyEntry::new("DeveloperRead", ResourceKind::Topic, "{tenant}.*");
        assert_eq!(entry.resolve_pattern("acme"), "acme.*");
    }

    #[test]
    fn test_default_policy_shape() {
        let policy = TenantPolicy::default();
        assert_eq!(policy.entries.len(), 7);
        assert!(!policy.allow_wildcard_environment);
        assert_eq!(policy.prefix_pattern("acme"), "acme-*");

        // One cluster-wide grant with no pattern
        let cluster_grants: Vec<_> = policy
            .entries
            .iter()
            .filter(|e| e.kind == ResourceKind::KafkaCluster)
            .collect();
        assert_eq!(cluster_grants.len(), 1);
        assert!(cluster_grants[0].pattern_template.is_empty());
    }

    #[test]
    fn test_entries_keep_declared_order() {
        let policy = TenantPolicy::prefix_isolation("{tenant}.*");
        assert_eq!(policy.entries[0].role_name, "DeveloperRead");
        assert_eq!(policy.entries[0].kind, ResourceKind::Topic);
        assert_eq!(policy.entries[1].role_name, "DeveloperWrite");
    }

    #[test]
    fn test_policy_serde_round_trip() {
        let policy = TenantPolicy::default();
        let json = serde_json::to_string(&policy).unwrap();
        let back: TenantPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries, policy.entries);
    }
}
