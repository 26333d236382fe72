//! tenantctl - Tenant provisioning for managed streaming platforms
//!
//! This crate automates tenant isolation inside a shared Confluent Cloud
//! style cluster: it creates a service account per tenant, issues an API key
//! bound to the tenant's cluster, and applies a prefix-scoped set of role
//! bindings. Every step is idempotent; re-running against an already
//! provisioned tenant reuses the existing resources.

pub mod client;
pub mod config;
pub mod crn;
pub mod error;
pub mod policy;
pub mod provision;
pub mod tenant;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
