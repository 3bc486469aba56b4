//! Claim introspection for the mounted identity token.
//!
//! The signature is **not** checked here. The broker verifies it during
//! login; this module only reads what the token says about itself so it can
//! be shown to a caller. The result is typed as [`SelfReportedIdentity`] and
//! must never feed an authorization decision.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

const LEGACY_NAMESPACE_CLAIM: &str = "kubernetes.io/serviceaccount/namespace";
const LEGACY_NAME_CLAIM: &str = "kubernetes.io/serviceaccount/service-account.name";
const SUBJECT_PREFIX: &str = "system:serviceaccount:";

/// Identity fields as claimed by an unverified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfReportedIdentity {
    pub namespace: String,
    pub name: String,
    pub issuer: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub raw: String,
}

/// Parses the claim segment of `raw` without consulting any key material.
///
/// # Errors
///
/// Returns [`Error::MalformedCredential`] unless `raw` has exactly three
/// dot-separated segments whose middle one is base64url JSON naming both a
/// namespace and a service account.
pub fn decode(raw: &str) -> Result<SelfReportedIdentity> {
    let raw = raw.trim();
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::MalformedCredential(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| Error::MalformedCredential(format!("claims are not base64url: {e}")))?;
    let claims: Value = serde_json::from_slice(&payload)
        .map_err(|e| Error::MalformedCredential(format!("claims are not JSON: {e}")))?;
    if !claims.is_object() {
        return Err(Error::MalformedCredential(
            "claims are not a JSON object".into(),
        ));
    }

    let (namespace, name) = service_account(&claims).ok_or_else(|| {
        Error::MalformedCredential("claims do not name a service account".into())
    })?;

    let issuer = claims["iss"].as_str().map(str::to_string);
    let expires_at = claims["exp"]
        .as_i64()
        .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));

    Ok(SelfReportedIdentity {
        namespace,
        name,
        issuer,
        expires_at,
        raw: raw.to_string(),
    })
}

/// Finds `(namespace, name)` in whichever claim layout the token uses.
fn service_account(claims: &Value) -> Option<(String, String)> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    // Legacy secret-based tokens.
    if let (Some(ns), Some(name)) = (
        non_empty(&claims[LEGACY_NAMESPACE_CLAIM]),
        non_empty(&claims[LEGACY_NAME_CLAIM]),
    ) {
        return Some((ns, name));
    }

    // Projected tokens.
    let projected = &claims["kubernetes.io"];
    if let (Some(ns), Some(name)) = (
        non_empty(&projected["namespace"]),
        non_empty(&projected["serviceaccount"]["name"]),
    ) {
        return Some((ns, name));
    }

    let subject = claims["sub"].as_str()?.strip_prefix(SUBJECT_PREFIX)?;
    let (ns, name) = subject.split_once(':')?;
    if ns.is_empty() || name.is_empty() || name.contains(':') {
        return None;
    }
    Some((ns.to_string(), name.to_string()))
}
