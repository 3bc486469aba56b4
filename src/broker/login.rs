use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{AuthRole, LoginResponse, parse_json};
use crate::error::{Error, Result};
use crate::fetch::{HttpClient, body_text, broker_url};
use crate::identity::IdentityCredential;

#[derive(Serialize)]
struct LoginRequest<'a> {
    role: &'a str,
    jwt: &'a str,
}

/// Exchanges the workload identity for a broker-scoped token.
///
/// The broker verifies the credential's signature; this client only carries
/// it. One request per call, no retries.
pub struct TokenExchangeClient<C> {
    client: C,
    broker: Url,
    auth_mount: String,
}

impl<C: HttpClient> TokenExchangeClient<C> {
    pub fn new(client: C, broker: Url, auth_mount: impl Into<String>) -> Self {
        Self {
            client,
            broker,
            auth_mount: auth_mount.into().trim_matches('/').to_string(),
        }
    }

    fn login_url(&self) -> Result<Url> {
        broker_url(&self.broker, &format!("v1/auth/{}/login", self.auth_mount))
    }

    /// Logs in as `role` with `credential`.
    ///
    /// # Errors
    ///
    /// - [`Error::BrokerRejected`] for any 4xx: expired credential, unknown
    ///   role, policy denial. Retrying with the same credential fails again.
    /// - [`Error::Network`] for 5xx and transport failures (refused, TLS,
    ///   timeout), including a body that stops arriving part way.
    /// - [`Error::Protocol`] when a 2xx body carries no token.
    #[tracing::instrument(skip_all, fields(role = %role, mount = %self.auth_mount))]
    pub async fn login(
        &self,
        role: &AuthRole,
        credential: &IdentityCredential,
    ) -> Result<LoginResponse> {
        let body = serde_json::to_vec(&LoginRequest {
            role: role.as_str(),
            jwt: credential.raw(),
        })
        .map_err(|e| Error::Protocol(format!("failed to encode login request: {e}")))?;

        let mut req = reqwest::Request::new(reqwest::Method::POST, self.login_url()?);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());

        let resp = self.client.execute(req).await?;
        let status = resp.status();
        let text = body_text(resp).await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Login response received");

        if status.is_success() {
            let login = LoginResponse::from_body(parse_json(&text)?)?;
            info!(lease_duration = ?login.lease_duration, "Broker token granted");
            return Ok(login);
        }

        if status.is_client_error() {
            warn!(status = status.as_u16(), "Broker rejected identity");
            return Err(Error::BrokerRejected { status, body: text });
        }

        if status.is_server_error() {
            return Err(Error::Network(format!("broker returned {status}")));
        }

        Err(Error::Protocol(format!("unexpected login status {status}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::fetch::BasicClient;
    use crate::fetch::test_support::{ScriptedClient, stalled_broker};

    fn exchange(client: Arc<ScriptedClient>) -> TokenExchangeClient<Arc<ScriptedClient>> {
        TokenExchangeClient::new(
            client,
            "http://vault.local:8200".parse().unwrap(),
            "kubernetes",
        )
    }

    fn role() -> AuthRole {
        AuthRole::new("demo").unwrap()
    }

    fn credential() -> IdentityCredential {
        IdentityCredential::new("header.claims.signature")
    }

    #[tokio::test]
    async fn test_login_sends_role_and_jwt() {
        let scripted =
            Arc::new(ScriptedClient::new().respond(200, r#"{"auth":{"client_token":"s.x"}}"#));
        exchange(scripted.clone())
            .login(&role(), &credential())
            .await
            .unwrap();

        let sent = scripted.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, reqwest::Method::POST);
        assert_eq!(sent[0].url, "http://vault.local:8200/v1/auth/kubernetes/login");
        assert_eq!(
            sent[0].json(),
            serde_json::json!({"role": "demo", "jwt": "header.claims.signature"})
        );
    }

    #[tokio::test]
    async fn test_login_returns_body_verbatim() {
        let body = r#"{"client_token":"s.abc123","lease_duration":3600}"#;
        let scripted = Arc::new(ScriptedClient::new().respond(200, body));

        let login = exchange(scripted).login(&role(), &credential()).await.unwrap();
        assert_eq!(login.token.expose(), "s.abc123");
        assert_eq!(login.lease_duration, Some(3600));
        assert_eq!(
            login.body,
            serde_json::from_str::<serde_json::Value>(body).unwrap()
        );
    }

    #[tokio::test]
    async fn test_login_4xx_is_rejection() {
        for status in [400, 403] {
            let scripted = Arc::new(
                ScriptedClient::new().respond(status, r#"{"errors":["permission denied"]}"#),
            );
            let err = exchange(scripted)
                .login(&role(), &credential())
                .await
                .unwrap_err();
            match err {
                Error::BrokerRejected { status: got, body } => {
                    assert_eq!(got.as_u16(), status);
                    assert!(body.contains("permission denied"));
                }
                other => panic!("expected BrokerRejected, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_login_5xx_is_network() {
        let scripted =
            Arc::new(ScriptedClient::new().respond(503, r#"{"errors":["Vault is sealed"]}"#));
        let err = exchange(scripted)
            .login(&role(), &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_login_connection_refused_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BasicClient::new(Duration::from_secs(2), None).unwrap();
        let exchange = TokenExchangeClient::new(
            client,
            format!("http://{addr}").parse().unwrap(),
            "kubernetes",
        );
        let err = exchange.login(&role(), &credential()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_login_timeout_is_network() {
        let addr = stalled_broker().await;

        let client = BasicClient::new(Duration::from_millis(300), None).unwrap();
        let exchange = TokenExchangeClient::new(
            client,
            format!("http://{addr}").parse().unwrap(),
            "kubernetes",
        );
        let err = exchange.login(&role(), &credential()).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_login_success_without_token_is_protocol_error() {
        let scripted = Arc::new(ScriptedClient::new().respond(200, r#"{"warnings":null}"#));
        let err = exchange(scripted)
            .login(&role(), &credential())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_login_uses_configured_mount() {
        let scripted =
            Arc::new(ScriptedClient::new().respond(200, r#"{"auth":{"client_token":"s.x"}}"#));
        let exchange = TokenExchangeClient::new(
            scripted.clone(),
            "http://vault.local:8200/".parse().unwrap(),
            "/k8s-prod/",
        );
        exchange.login(&role(), &credential()).await.unwrap();
        assert_eq!(
            scripted.requests()[0].url,
            "http://vault.local:8200/v1/auth/k8s-prod/login"
        );
    }
}
