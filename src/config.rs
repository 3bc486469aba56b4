//! Process-wide gateway configuration.
//!
//! Built once at startup and handed to constructors; no component reads the
//! environment on its own.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::broker::AuthRole;
use crate::identity::{SERVICE_CERT_FILENAME, SERVICE_TOKEN_FILENAME};

pub const DEFAULT_BROKER_URL: &str = "http://127.0.0.1:8200";
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
pub const DEFAULT_LISTEN_PORT: u16 = 3000;
pub const DEFAULT_AUTH_ROLE: &str = "demo";
pub const DEFAULT_AUTH_MOUNT: &str = "kubernetes";
pub const DEFAULT_KV_MOUNT: &str = "kv";
pub const DEFAULT_SECRET_PATH: &str = "restricted/external-certificate";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_INDEX_PATH: &str = "index.html";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the secret broker.
    pub broker_url: Url,
    pub listen_addr: SocketAddr,
    pub token_path: PathBuf,
    pub ca_path: PathBuf,
    pub auth_role: AuthRole,
    /// Broker auth backend mount the login goes to.
    pub auth_mount: String,
    /// Versioned key-value mount, independent of `secret_path`.
    pub kv_mount: String,
    pub secret_path: String,
    /// Upper bound on each outbound broker call.
    pub timeout: Duration,
    pub index_path: PathBuf,
    /// Report missing secrets as "not allowed" so callers cannot probe for
    /// existence.
    pub hide_missing_secrets: bool,
}

impl GatewayConfig {
    /// Configuration for `broker_url` with every other setting at its
    /// default.
    pub fn new(broker_url: Url) -> Self {
        Self {
            broker_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_LISTEN_PORT)),
            token_path: PathBuf::from(SERVICE_TOKEN_FILENAME),
            ca_path: PathBuf::from(SERVICE_CERT_FILENAME),
            auth_role: AuthRole::default(),
            auth_mount: DEFAULT_AUTH_MOUNT.to_string(),
            kv_mount: DEFAULT_KV_MOUNT.to_string(),
            secret_path: DEFAULT_SECRET_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            hide_missing_secrets: false,
        }
    }

    /// Parses and checks the raw broker URL.
    pub fn parse_broker_url(raw: &str) -> Result<Url> {
        let url: Url = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid broker URL '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("broker URL must be http or https, got '{}'", url.scheme());
        }
        if url.host_str().is_none() {
            bail!("broker URL '{raw}' has no host");
        }
        Ok(url)
    }

    pub fn parse_listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
        format!("{host}:{port}")
            .parse::<SocketAddr>()
            .or_else(|_| format!("[{host}]:{port}").parse::<SocketAddr>())
            .with_context(|| format!("invalid listen address '{host}:{port}'"))
    }

    /// Rejects combinations the components cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            bail!("broker timeout must be greater than zero");
        }
        for (name, value) in [
            ("auth mount", &self.auth_mount),
            ("kv mount", &self.kv_mount),
            ("secret path", &self.secret_path),
        ] {
            if value.trim_matches('/').trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        Ok(())
    }
}
