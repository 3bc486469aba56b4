use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::AppState;
use crate::broker::BrokerToken;
use crate::error::{Error, Result};
use crate::fetch::HttpClient;
use crate::identity;

/// What the introspection endpoint shows. The fields are the token's own
/// claims, unverified.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityView {
    pub name: String,
    pub namespace: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    pub token: Option<String>,
}

/// `GET /`
pub async fn index<C: HttpClient>(State(state): State<Arc<AppState<C>>>) -> Response {
    match tokio::fs::read_to_string(&state.config.index_path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            debug!(path = %state.config.index_path.display(), error = %e, "Index page unavailable");
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "index page not found" })),
            )
                .into_response()
        }
    }
}

/// `GET /healthz`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/serviceAccount`: the workload identity as it claims itself.
pub async fn service_account<C: HttpClient>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<IdentityView>> {
    let credential = state.reader.read()?;
    let identity = identity::decode(credential.raw())?;
    info!(namespace = %identity.namespace, name = %identity.name, "Identity introspected");

    Ok(Json(IdentityView {
        name: identity.name,
        namespace: identity.namespace,
        token: identity.raw,
    }))
}

/// `GET /api/vaultToken`: exchange the mounted identity for a broker token.
pub async fn vault_token<C: HttpClient>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<Value>> {
    let credential = state.reader.read()?;
    let login = state
        .exchange
        .login(&state.config.auth_role, &credential)
        .await?;
    Ok(Json(login.body))
}

/// `GET /api/externalCertificate?token=..`: read the protected secret with a
/// caller-supplied broker token.
pub async fn external_certificate<C: HttpClient>(
    State(state): State<Arc<AppState<C>>>,
    Query(query): Query<SecretQuery>,
) -> Result<Json<Value>> {
    let token = BrokerToken::parse(query.token.as_deref().unwrap_or_default())?;

    match state.secrets.fetch(&token, &state.config.secret_path).await {
        Ok(payload) => Ok(Json(payload.raw)),
        Err(Error::NotFound { .. }) if state.config.hide_missing_secrets => {
            Err(Error::Unauthorized)
        }
        Err(e) => Err(e),
    }
}
