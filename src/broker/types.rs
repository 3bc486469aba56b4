use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The broker-side role an identity is exchanged against. One per
/// deployment, taken from configuration and never from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRole(String);

impl AuthRole {
    pub fn new(role: impl Into<String>) -> Result<Self> {
        let role = role.into().trim().to_string();
        if role.is_empty() {
            return Err(Error::Protocol("auth role must not be empty".into()));
        }
        Ok(Self(role))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AuthRole {
    fn default() -> Self {
        Self(crate::config::DEFAULT_AUTH_ROLE.to_string())
    }
}

impl std::fmt::Display for AuthRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque broker-issued bearer token. Its lease is tracked by the broker,
/// not here.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerToken(String);

impl BrokerToken {
    /// Accepts a caller-supplied token. Blank input is the "no token" case.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::MissingToken);
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BrokerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BrokerToken(<redacted>)")
    }
}

/// Result of a successful login.
///
/// `body` is the broker's response exactly as received; the typed fields
/// are lifted out of it.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: BrokerToken,
    pub lease_duration: Option<u64>,
    pub renewable: Option<bool>,
    pub body: Value,
}

impl LoginResponse {
    /// Lifts the token and lease out of either the native `auth` envelope or
    /// a flat body.
    pub(crate) fn from_body(body: Value) -> Result<Self> {
        let auth = match body.get("auth") {
            Some(auth) if auth.is_object() => auth,
            _ => &body,
        };

        let token = auth["client_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Protocol("login response has no client_token".into()))
            .and_then(BrokerToken::parse)?;
        let lease_duration = auth["lease_duration"].as_u64();
        let renewable = auth["renewable"].as_bool();

        Ok(Self {
            token,
            lease_duration,
            renewable,
            body,
        })
    }
}

/// One version of a secret read from the broker's versioned store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretPayload {
    pub data: Map<String, Value>,
    pub version: u64,
    #[serde(skip)]
    pub raw: Value,
}

impl SecretPayload {
    pub(crate) fn from_body(body: Value) -> Result<Self> {
        let envelope = &body["data"];
        let data = envelope["data"]
            .as_object()
            .cloned()
            .ok_or_else(|| Error::Protocol("secret response has no data.data object".into()))?;
        let version = envelope["metadata"]["version"]
            .as_u64()
            .ok_or_else(|| Error::Protocol("secret response has no metadata.version".into()))?;

        Ok(Self {
            data,
            version,
            raw: body,
        })
    }
}
