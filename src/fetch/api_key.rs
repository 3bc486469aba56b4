use crate::error::{Error, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// Header the secret broker reads its bearer token from.
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// An [`HttpClient`] wrapper that injects a token as an HTTP header on every
/// request it forwards.
///
/// The header is validated once at construction so that forwarding never
/// fails on a bad name or value.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| Error::Protocol(format!("invalid header name '{header_name}': {e}")))?;
        // A token that cannot travel as a header value cannot carry a grant.
        let mut key = HeaderValue::from_str(key).map_err(|_| Error::Unauthorized)?;
        key.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            key,
        })
    }

    /// Wraps `inner` so every request presents `token` to the secret broker.
    pub fn vault_token(inner: C, token: &str) -> Result<Self> {
        Self::new(inner, VAULT_TOKEN_HEADER, token)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_support::ScriptedClient;

    #[tokio::test]
    async fn test_injects_vault_token_header() {
        let inner = ScriptedClient::new().respond(200, "{}");
        let client = ApiKey::vault_token(&inner, "s.abc123").unwrap();

        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://broker.local/v1/kv/data/x".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let sent = inner.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header(VAULT_TOKEN_HEADER).as_deref(), Some("s.abc123"));
    }

    #[test]
    fn test_token_with_newline_is_refused() {
        let inner = ScriptedClient::new();
        let result = ApiKey::vault_token(&inner, "s.abc\n123");
        assert!(matches!(result, Err(Error::Unauthorized)));
    }
}
