//! HTTP surface over the identity exchange chain.
//!
//! Handlers are plain functions over an immutable [`AppState`]; nothing is
//! shared between requests except configuration and the pooled transport.

mod error;
mod handlers;

pub use error::{NO_TOKEN_MESSAGE, NOT_ALLOWED_MESSAGE};
pub use handlers::{IdentityView, SecretQuery};

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::broker::{SecretFetcher, TokenExchangeClient};
use crate::config::GatewayConfig;
use crate::fetch::HttpClient;
use crate::identity::IdentityReader;

/// Collaborators every handler receives.
pub struct AppState<C> {
    pub config: GatewayConfig,
    pub reader: IdentityReader,
    pub exchange: TokenExchangeClient<C>,
    pub secrets: SecretFetcher<C>,
}

impl<C: HttpClient + Clone> AppState<C> {
    pub fn new(config: GatewayConfig, client: C) -> Self {
        let reader = IdentityReader::new(&config.token_path, &config.ca_path);
        let exchange = TokenExchangeClient::new(
            client.clone(),
            config.broker_url.clone(),
            &config.auth_mount,
        );
        let secrets = SecretFetcher::new(client, config.broker_url.clone(), &config.kv_mount);
        Self {
            config,
            reader,
            exchange,
            secrets,
        }
    }
}

pub fn router<C: HttpClient + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/", get(handlers::index::<C>))
        .route("/healthz", get(handlers::health))
        .route("/api/serviceAccount", get(handlers::service_account::<C>))
        .route("/api/vaultToken", get(handlers::vault_token::<C>))
        .route(
            "/api/externalCertificate",
            get(handlers::external_certificate::<C>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
