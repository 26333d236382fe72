//! Canonical resource name (CRN) construction
//!
//! Role bindings are scoped by CRN patterns addressing resources inside the
//! control plane hierarchy. Construction rules differ per resource kind, so
//! all CRN assembly lives here and the rest of the crate treats the result
//! as an opaque string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

/// CRN scheme prefix for the Confluent Cloud control plane.
pub const CRN_SCHEME: &str = "crn://confluent.cloud";

/// Maximum length of a resource name pattern. Matches the broker-side topic
/// name limit; longer patterns are rejected before any network call.
pub const MAX_PATTERN_LEN: usize = 249;

/// Wildcard component meaning "any" for organization/environment/cluster.
pub const WILDCARD: &str = "*";

/// Resource kinds a role binding can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Topic,
    ConsumerGroup,
    TransactionalId,
    /// The Kafka cluster itself, not a sub-resource.
    KafkaCluster,
    SchemaSubject,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Topic => "topic",
            ResourceKind::ConsumerGroup => "consumer-group",
            ResourceKind::TransactionalId => "transactional-id",
            ResourceKind::KafkaCluster => "kafka-cluster",
            ResourceKind::SchemaSubject => "schema-subject",
        }
    }

    /// Trailing CRN segment name for kinds that scope a sub-resource.
    fn segment(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Topic => Some("topic"),
            ResourceKind::ConsumerGroup => Some("group"),
            ResourceKind::TransactionalId => Some("transactional-id"),
            ResourceKind::KafkaCluster => None,
            ResourceKind::SchemaSubject => Some("subject"),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "topic" => Ok(ResourceKind::Topic),
            "consumer-group" => Ok(ResourceKind::ConsumerGroup),
            "transactional-id" => Ok(ResourceKind::TransactionalId),
            "kafka-cluster" => Ok(ResourceKind::KafkaCluster),
            "schema-subject" => Ok(ResourceKind::SchemaSubject),
            other => Err(AppError::UnsupportedResourceKind(other.to_string())),
        }
    }
}

/// Build the fully qualified CRN pattern for a resource kind.
///
/// `org`, `env` and `cluster` may be the `*` wildcard; the builder does not
/// decide whether a wildcard is intentional, callers do. The `pattern` is
/// the resource name or prefix pattern (ignored for `kafka-cluster`).
pub fn build_crn(
    kind: ResourceKind,
    org: &str,
    env: &str,
    cluster: &str,
    pattern: &str,
) -> Result<String> {
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(AppError::PatternTooLong(pattern.len()));
    }

    let base = format!("{CRN_SCHEME}/organization={org}/environment={env}");

    let crn = match kind {
        ResourceKind::Topic | ResourceKind::ConsumerGroup | ResourceKind::TransactionalId => {
            let segment = kind.segment().unwrap_or_default();
            format!("{base}/cloud-cluster={cluster}/kafka={cluster}/{segment}={pattern}")
        }
        // Grant on the cluster itself: no trailing resource segment.
        ResourceKind::KafkaCluster => format!("{base}/cloud-cluster={cluster}"),
        ResourceKind::SchemaSubject => {
            format!("{base}/schema-registry={cluster}/subject={pattern}")
        }
    };

    Ok(crn)
}
