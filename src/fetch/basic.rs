use std::time::Duration;

use super::client::HttpClient;
use crate::error::{Error, Result};
use crate::identity::TrustBundle;
use async_trait::async_trait;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The production [`HttpClient`]: a pooled `reqwest` client bounded by the
/// configured timeout and trusting the platform's root bundle.
#[derive(Clone)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Builds a client that trusts `bundle` in addition to the system roots.
    pub fn new(timeout: Duration, bundle: Option<&TrustBundle>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout));

        if let Some(bundle) = bundle {
            for cert in bundle.certificates()? {
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder.build().map_err(Error::ClientBuild)?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_support::stalled_broker;

    #[test]
    fn test_builds_without_bundle() {
        assert!(BasicClient::new(Duration::from_secs(1), None).is_ok());
    }

    #[test]
    fn test_builds_with_cluster_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let ca_path = dir.path().join("ca.crt");
        std::fs::write(&ca_path, include_str!("../../tests/fixtures/ca.crt")).unwrap();

        let bundle = TrustBundle::load(&ca_path).unwrap();
        assert!(BasicClient::new(Duration::from_secs(1), Some(&bundle)).is_ok());
    }

    #[test]
    fn test_unusable_bundle_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let ca_path = dir.path().join("ca.crt");
        std::fs::write(&ca_path, "").unwrap();

        let bundle = TrustBundle::load(&ca_path).unwrap();
        let err = BasicClient::new(Duration::from_secs(1), Some(&bundle))
            .err()
            .unwrap();
        assert!(matches!(err, Error::TrustBundle { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_build_failure_is_not_retryable() {
        let err = reqwest::Client::builder()
            .user_agent("bad\nagent")
            .build()
            .unwrap_err();
        assert!(!Error::ClientBuild(err).is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Grab a free port, then close it so nothing is listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BasicClient::new(Duration::from_secs(2), None).unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            format!("http://{addr}/v1/sys/health").parse().unwrap(),
        );
        let err = client.execute(req).await.unwrap_err();
        assert!(Error::from(err).is_retryable());
    }

    #[tokio::test]
    async fn test_stalled_broker_times_out() {
        let addr = stalled_broker().await;

        let client = BasicClient::new(Duration::from_millis(300), None).unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            format!("http://{addr}/v1/sys/health").parse().unwrap(),
        );
        let started = std::time::Instant::now();
        let resp = client.execute(req).await.unwrap();
        let err = Error::from(resp.text().await.unwrap_err());

        assert!(matches!(err, Error::Network(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
