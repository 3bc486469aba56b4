//! Outbound HTTP transport.
//!
//! [`HttpClient`] is the seam every broker call goes through; [`BasicClient`]
//! is the real implementation and [`ApiKey`] layers a token header on top.

mod api_key;
mod basic;
mod client;

pub use api_key::{ApiKey, VAULT_TOKEN_HEADER};
pub use basic::BasicClient;
pub use client::HttpClient;

use crate::error::{Error, Result};

/// Joins `path` onto the broker base URL, normalizing the slashes between
/// them.
pub fn broker_url(base: &url::Url, path: &str) -> Result<url::Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    joined
        .parse()
        .map_err(|e| Error::Protocol(format!("invalid broker URL '{joined}': {e}")))
}

/// Reads a response body as text. A body cut short by the timeout or a
/// dropped connection is a [`Error::Network`] failure like any other
/// transport error.
pub(crate) async fn body_text(resp: reqwest::Response) -> Result<String> {
    Ok(resp.text().await?)
}
