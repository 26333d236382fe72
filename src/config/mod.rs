//! Configuration management for tenantctl

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

/// Default control plane endpoint.
const DEFAULT_BASE_URL: &str = "https://api.confluent.cloud";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Control plane API configuration
    pub control_plane: ControlPlaneConfig,
}

#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Base URL of the control plane API
    pub base_url: String,
    /// Cloud API key used for HTTP Basic authentication
    pub api_key: String,
    /// Cloud API secret used for HTTP Basic authentication
    pub api_secret: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// A cloud API key/secret pair read from the environment or a file.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiCredentials {
    /// Load credentials from `CONFLUENT_API_KEY` / `CONFLUENT_API_SECRET`.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("CONFLUENT_API_KEY").context("CONFLUENT_API_KEY is required")?;
        let api_secret =
            env::var("CONFLUENT_API_SECRET").context("CONFLUENT_API_SECRET is required")?;
        Self::validated(api_key, api_secret)
    }

    /// Load credentials from a text file.
    ///
    /// Two formats are accepted:
    /// - `api_key=...` / `api_secret=...` lines (`#` comments ignored)
    /// - a line starting with `API key` followed by the key on the next
    ///   line, and likewise for `API secret` (the console download format)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("malformed credentials file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let mut api_key = None;
        let mut api_secret = None;

        // key=value format
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "api_key" => api_key = Some(value.trim().to_string()),
                    "api_secret" => api_secret = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        // Fall back to the labeled two-line format
        if api_key.is_none() || api_secret.is_none() {
            let lines: Vec<&str> = contents.lines().map(str::trim).collect();
            for (i, line) in lines.iter().enumerate() {
                if line.starts_with("API key") {
                    api_key = lines.get(i + 1).map(|v| v.to_string());
                } else if line.starts_with("API secret") {
                    api_secret = lines.get(i + 1).map(|v| v.to_string());
                }
            }
        }

        match (api_key, api_secret) {
            (Some(key), Some(secret)) => Self::validated(key, secret),
            _ => bail!(
                "expected either api_key=/api_secret= lines or \
                 'API key' / 'API secret' labeled lines"
            ),
        }
    }

    fn validated(api_key: String, api_secret: String) -> Result<Self> {
        if api_key.is_empty() || api_secret.is_empty() {
            bail!("API key and secret must be non-empty");
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }
}

impl Config {
    /// Load configuration from environment variables, taking credentials
    /// from `credentials_file` when one is supplied.
    pub fn load(credentials_file: Option<&Path>) -> Result<Self> {
        let credentials = match credentials_file {
            Some(path) => ApiCredentials::from_file(path)?,
            None => ApiCredentials::from_env()?,
        };

        Ok(Self {
            control_plane: ControlPlaneConfig {
                base_url: env::var("CONFLUENT_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                api_key: credentials.api_key,
                api_secret: credentials.api_secret,
                timeout_secs: env::var("CONFLUENT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid CONFLUENT_TIMEOUT_SECS")?,
            },
        })
    }
}
