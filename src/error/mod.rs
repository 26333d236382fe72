//! Unified error handling for tenantctl

use thiserror::Error;

use crate::crn::MAX_PATTERN_LEN;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unsupported resource kind: {0}")]
    UnsupportedResourceKind(String),

    #[error("resource pattern is {0} characters, maximum is {MAX_PATTERN_LEN}")]
    PatternTooLong(usize),

    /// The remote system reported a duplicate resource. Idempotent paths
    /// treat this as success.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("could not resolve a service account for tenant '{tenant}': {detail}")]
    IdentityResolutionFailed { tenant: String, detail: String },

    #[error(
        "environment id is required: the cluster lookup could not determine it \
         and the policy does not allow wildcard environments"
    )]
    EnvironmentRequired,

    /// The configured API key lacks the admin privilege required by the
    /// endpoint. The message names the missing tier so operators can fix it.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Timeout or connection failure. Read-only calls retry a bounded number
    /// of times on this variant; create calls never do.
    #[error("transient control plane failure: {0}")]
    Transient(String),

    #[error("control plane returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// Whether this error means "the resource already exists".
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}
