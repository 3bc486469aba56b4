use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use super::{BrokerToken, SecretPayload, parse_json};
use crate::error::{Error, Result};
use crate::fetch::{ApiKey, HttpClient, body_text, broker_url};

/// Reads single secrets from the broker's versioned key-value store.
///
/// Stateless per call: the token is presented as given and never renewed
/// or cached.
pub struct SecretFetcher<C> {
    client: C,
    broker: Url,
    mount: String,
}

impl<C: HttpClient> SecretFetcher<C> {
    pub fn new(client: C, broker: Url, mount: impl Into<String>) -> Self {
        Self {
            client,
            broker,
            mount: mount.into().trim_matches('/').to_string(),
        }
    }

    fn data_url(&self, path: &str) -> Result<Url> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(Error::NotFound {
                path: path.to_string(),
            });
        }
        broker_url(&self.broker, &format!("v1/{}/data/{path}", self.mount))
    }

    /// Reads the latest version of the secret at `path` under this fetcher's
    /// mount, authenticating with `token`.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] when the broker answers forbidden.
    /// - [`Error::NotFound`] when the path does not exist. Callers that hide
    ///   existence fold this into `Unauthorized` themselves.
    /// - [`Error::Network`] for 5xx and transport failures, including the
    ///   configured timeout expiring mid-body.
    /// - [`Error::Protocol`] for any other status or an unreadable body.
    #[tracing::instrument(skip_all, fields(mount = %self.mount, path = %path))]
    pub async fn fetch(&self, token: &BrokerToken, path: &str) -> Result<SecretPayload> {
        let url = self.data_url(path)?;
        let client = ApiKey::vault_token(&self.client, token.expose())?;

        let req = reqwest::Request::new(reqwest::Method::GET, url);
        let resp = client.execute(req).await?;
        let status = resp.status();
        let text = body_text(resp).await?;
        debug!(status = status.as_u16(), "Secret read response received");

        match status {
            s if s.is_success() => {
                let payload = SecretPayload::from_body(parse_json(&text)?)?;
                debug!(version = payload.version, fields = payload.data.len(), "Secret read");
                Ok(payload)
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                warn!("Token not permitted to read secret");
                Err(Error::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                path: path.trim_matches('/').to_string(),
            }),
            s if s.is_server_error() => Err(Error::Network(format!("broker returned {s}"))),
            s => Err(Error::Protocol(format!("unexpected secret read status {s}"))),
        }
    }
}
