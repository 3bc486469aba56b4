//! CLI entry point for the identity gateway.
//!
//! `serve` runs the HTTP gateway; `whoami`, `login` and `read` run a single
//! step of the exchange from the command line against the same
//! configuration.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use identity_gateway::{
    broker::{BrokerToken, SecretFetcher, TokenExchangeClient},
    config::{
        DEFAULT_AUTH_MOUNT, DEFAULT_AUTH_ROLE, DEFAULT_BROKER_URL, DEFAULT_INDEX_PATH,
        DEFAULT_KV_MOUNT, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_SECRET_PATH,
        DEFAULT_TIMEOUT_SECS, GatewayConfig,
    },
    fetch::BasicClient,
    gateway::{AppState, router},
    identity::{self, IdentityReader, SERVICE_CERT_FILENAME, SERVICE_TOKEN_FILENAME, TrustBundle},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "identity_gateway")]
#[command(about = "Exchange a workload identity for a broker token and read one secret", long_about = None)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GatewayArgs {
    /// Base URL of the secret broker
    #[arg(long, env = "VAULT_URL", default_value = DEFAULT_BROKER_URL, global = true)]
    vault_url: String,

    /// Address the gateway listens on
    #[arg(long, env = "WEB_HOST", default_value = DEFAULT_LISTEN_HOST, global = true)]
    web_host: String,

    #[arg(long, env = "WEB_PORT", default_value_t = DEFAULT_LISTEN_PORT, global = true)]
    web_port: u16,

    /// Mounted service-account token
    #[arg(long, env = "SERVICE_TOKEN_FILE", default_value = SERVICE_TOKEN_FILENAME, global = true)]
    token_file: PathBuf,

    /// Mounted cluster root-of-trust bundle
    #[arg(long, env = "SERVICE_CERT_FILE", default_value = SERVICE_CERT_FILENAME, global = true)]
    cert_file: PathBuf,

    /// Broker role the identity is exchanged against
    #[arg(long, env = "VAULT_ROLE", default_value = DEFAULT_AUTH_ROLE, global = true)]
    role: String,

    /// Broker auth mount used for login
    #[arg(long, env = "VAULT_AUTH_MOUNT", default_value = DEFAULT_AUTH_MOUNT, global = true)]
    auth_mount: String,

    /// Versioned key-value mount holding the secret
    #[arg(long, env = "VAULT_KV_MOUNT", default_value = DEFAULT_KV_MOUNT, global = true)]
    kv_mount: String,

    /// Secret path under the key-value mount
    #[arg(long, env = "VAULT_SECRET_PATH", default_value = DEFAULT_SECRET_PATH, global = true)]
    secret_path: String,

    /// Timeout for each broker call, in seconds
    #[arg(long, env = "VAULT_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,

    /// HTML page served at `/`
    #[arg(long, env = "INDEX_PATH", default_value = DEFAULT_INDEX_PATH, global = true)]
    index_path: PathBuf,

    /// Answer "not allowed" for secrets that do not exist
    #[arg(long, env = "HIDE_MISSING_SECRETS", global = true)]
    hide_missing_secrets: bool,
}

impl GatewayArgs {
    fn into_config(self) -> Result<GatewayConfig> {
        let config = GatewayConfig {
            broker_url: GatewayConfig::parse_broker_url(&self.vault_url)?,
            listen_addr: GatewayConfig::parse_listen_addr(&self.web_host, self.web_port)?,
            token_path: self.token_file,
            ca_path: self.cert_file,
            auth_role: identity_gateway::broker::AuthRole::new(self.role)
                .context("VAULT_ROLE must not be empty")?,
            auth_mount: self.auth_mount,
            kv_mount: self.kv_mount,
            secret_path: self.secret_path,
            timeout: Duration::from_secs(self.timeout_secs),
            index_path: self.index_path,
            hide_missing_secrets: self.hide_missing_secrets,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve,
    /// Print the identity the mounted token claims
    Whoami,
    /// Exchange the mounted identity for a broker token and print the response
    Login,
    /// Read the configured secret with a broker token
    Read {
        /// Broker token to authenticate with
        #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
        token: String,

        /// Override the configured secret path
        #[arg(long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/identity_gateway.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("identity_gateway.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = cli.gateway.into_config()?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Whoami => {
            let reader = IdentityReader::new(&config.token_path, &config.ca_path);
            let credential = reader.read()?;
            let identity = identity::decode(credential.raw())?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Commands::Login => {
            let client = broker_client(&config)?;
            let reader = IdentityReader::new(&config.token_path, &config.ca_path);
            let exchange =
                TokenExchangeClient::new(client, config.broker_url.clone(), &config.auth_mount);

            let credential = reader.read()?;
            let login = exchange.login(&config.auth_role, &credential).await?;
            println!("{}", serde_json::to_string_pretty(&login.body)?);
        }
        Commands::Read { token, path } => {
            let client = broker_client(&config)?;
            let fetcher = SecretFetcher::new(client, config.broker_url.clone(), &config.kv_mount);

            let token = BrokerToken::parse(&token)?;
            let path = path.unwrap_or_else(|| config.secret_path.clone());
            let payload = fetcher.fetch(&token, &path).await?;
            println!("{}", serde_json::to_string_pretty(&payload.raw)?);
        }
    }

    Ok(())
}

/// Loads the trust bundle and builds the outbound client around it.
fn broker_client(config: &GatewayConfig) -> Result<BasicClient> {
    let bundle = TrustBundle::load(&config.ca_path).context("failed to load trust bundle")?;
    let certificates = bundle.certificates()?;
    info!(
        path = %bundle.path().display(),
        bytes = bundle.len(),
        certificates = certificates.len(),
        "Trust bundle loaded"
    );
    Ok(BasicClient::new(config.timeout, Some(&bundle))?)
}

/// Runs the gateway until Ctrl+C.
#[tracing::instrument(skip_all, fields(listen = %config.listen_addr, broker = %config.broker_url))]
async fn serve(config: GatewayConfig) -> Result<()> {
    let client = broker_client(&config)?;
    let listen_addr = config.listen_addr;
    let state = Arc::new(AppState::new(config, client));

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(%listen_addr, "Starting web server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await
        .context("gateway server failed")?;

    info!("Gateway stopped");
    Ok(())
}
