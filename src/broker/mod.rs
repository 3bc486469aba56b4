//! Secret broker protocol.
//!
//! [`TokenExchangeClient`] trades a workload identity for a broker token;
//! [`SecretFetcher`] spends that token on one versioned secret read.

mod kv;
mod login;
mod types;

pub use kv::SecretFetcher;
pub use login::TokenExchangeClient;
pub use types::{AuthRole, BrokerToken, LoginResponse, SecretPayload};

use serde_json::Value;

use crate::error::{Error, Result};

/// Pulls the broker's `{"errors": [...]}` messages out of a failure body.
pub fn broker_errors(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let messages: Vec<&str> = parsed["errors"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .filter(|m| !m.is_empty())
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

/// Decodes a 2xx broker body as JSON.
pub(crate) fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("response is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_errors_joined() {
        let body = r#"{"errors":["permission denied","invalid role name \"x\""]}"#;
        assert_eq!(
            broker_errors(body).as_deref(),
            Some("permission denied; invalid role name \"x\"")
        );
    }

    #[test]
    fn test_broker_errors_absent() {
        assert_eq!(broker_errors(""), None);
        assert_eq!(broker_errors("<html>bad gateway</html>"), None);
        assert_eq!(broker_errors(r#"{"errors":[]}"#), None);
    }
}
