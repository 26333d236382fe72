use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenantctl::client::ControlPlaneClient;
use tenantctl::config::Config;
use tenantctl::policy::TenantPolicy;
use tenantctl::provision::{BindingStatus, ProvisionRequest};
use tenantctl::tenant::{TenantManager, TenantSummary};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tenantctl",
    version,
    about = "Tenant provisioning for managed streaming clusters"
)]
struct Cli {
    /// File holding the cloud API key/secret. Falls back to the
    /// CONFLUENT_API_KEY / CONFLUENT_API_SECRET environment variables.
    #[arg(long, global = true)]
    credentials_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision a tenant: service account, API key, and role bindings
    Create {
        /// Logical tenant/project name
        tenant_name: String,
        /// Kafka cluster id (e.g. lkc-xxxxx)
        #[arg(long)]
        cluster_id: String,
        /// Environment id; auto-resolved from the cluster when omitted
        #[arg(long)]
        environment_id: Option<String>,
        /// Organization id; defaults to the wildcard
        #[arg(long)]
        organization_id: Option<String>,
        /// Prefix pattern template; `{tenant}` is substituted
        #[arg(long, default_value = "{tenant}-*")]
        prefix_template: String,
        /// Proceed with environment=* when the cluster lookup cannot
        /// determine the environment
        #[arg(long)]
        allow_wildcard_environment: bool,
    },
    /// Show a tenant's provisioned resources (read-only)
    #[command(alias = "list")]
    Describe {
        tenant_name: String,
        /// Cluster id; when given, the tenant's API key is looked up too
        #[arg(long)]
        cluster_id: Option<String>,
        /// Prefix pattern template; `{tenant}` is substituted
        #[arg(long, default_value = "{tenant}-*")]
        prefix_template: String,
    },
    /// Report what must be removed manually to retire a tenant
    Delete { tenant_name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenantctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load(cli.credentials_file.as_deref())?;
    let client = ControlPlaneClient::new(config.control_plane.clone());

    match cli.command {
        Command::Create {
            tenant_name,
            cluster_id,
            environment_id,
            organization_id,
            prefix_template,
            allow_wildcard_environment,
        } => {
            let mut policy = TenantPolicy::prefix_isolation(prefix_template);
            policy.allow_wildcard_environment = allow_wildcard_environment;
            let manager = TenantManager::new(client, policy);

            info!("creating tenant '{tenant_name}' on cluster {cluster_id}");
            let summary = manager
                .create_tenant(&ProvisionRequest {
                    tenant_name,
                    cluster_id,
                    environment_id,
                    organization_id,
                })
                .await?;
            print_summary(&summary);
        }
        Command::Describe {
            tenant_name,
            cluster_id,
            prefix_template,
        } => {
            let policy = TenantPolicy::prefix_isolation(prefix_template);
            let manager = TenantManager::new(client, policy);

            match manager
                .describe_tenant(&tenant_name, cluster_id.as_deref())
                .await?
            {
                Some(summary) => print_summary(&summary),
                None => println!("No resources found for tenant '{tenant_name}'"),
            }
        }
        Command::Delete { tenant_name } => {
            let manager = TenantManager::new(client, TenantPolicy::default());
            let report = manager.deprovision_tenant(&tenant_name).await?;

            match report.identity_id {
                Some(identity_id) => {
                    println!("Tenant '{}' resources:", report.tenant_name);
                    println!("  Service account: {identity_id}");
                    println!("  Role bindings:   {}", report.binding_count);
                    println!();
                    println!(
                        "The automated path does not delete resources. Remove the \
                         service account, its API keys, and the role bindings above \
                         in the cloud console."
                    );
                }
                None => println!("No resources found for tenant '{}'", report.tenant_name),
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &TenantSummary) {
    println!("======================================================================");
    println!("Tenant:          {}", summary.tenant_name);
    println!(
        "Service account: {} ({})",
        summary.identity_id,
        if summary.identity_existing {
            "existing"
        } else {
            "new"
        }
    );
    if let Some(created_at) = summary.created_at {
        println!("Created:         {}", created_at.to_rfc3339());
    }
    match (&summary.credential_id, summary.credential_existing) {
        (Some(id), true) => println!("API key:         {id} (existing, secret not retrievable)"),
        (Some(id), false) => println!("API key:         {id} (new)"),
        (None, _) => println!("API key:         not resolved"),
    }
    println!("Resource prefix: {}", summary.prefix_pattern);
    if let Some(environment_id) = &summary.environment_id {
        println!("Environment:     {environment_id}");
    }

    if !summary.bindings.is_empty() {
        println!("Role bindings:");
        for binding in &summary.bindings {
            let status = match &binding.status {
                BindingStatus::Created => "created".to_string(),
                BindingStatus::AlreadyExists => "already exists".to_string(),
                BindingStatus::Failed(detail) => format!("FAILED: {detail}"),
            };
            println!(
                "  {:<16} {:<50} {}",
                binding.role_name, binding.crn_pattern, status
            );
        }
    }

    if let Some(secret) = &summary.secret {
        println!("======================================================================");
        println!("API secret (shown once, store it now):");
        println!("{secret}");
    }
    println!("======================================================================");
}
