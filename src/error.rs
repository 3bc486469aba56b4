//! Error taxonomy for the identity exchange chain.
//!
//! Every component returns [`Result`]; nothing here is logged-and-swallowed.
//! The gateway turns each kind into a distinct caller-facing message.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A local identity file could not be read. The process is not running
    /// where it expects to be.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The identity file was read but its claims could not be parsed.
    #[error("malformed identity credential: {0}")]
    MalformedCredential(String),

    /// The broker could not be reached, or answered with a server error.
    #[error("broker unreachable: {0}")]
    Network(String),

    /// The broker declined the identity during login.
    #[error("broker rejected credential ({status}): {body}")]
    BrokerRejected { status: StatusCode, body: String },

    /// The broker token lacks a policy grant for the requested path.
    #[error("token is not permitted to read this secret")]
    Unauthorized,

    /// The requested secret does not exist.
    #[error("secret not found: {path}")]
    NotFound { path: String },

    /// No broker token was supplied.
    #[error("no token provided")]
    MissingToken,

    /// The broker answered with something this client cannot interpret.
    #[error("unexpected broker response: {0}")]
    Protocol(String),

    /// The mounted root-of-trust bundle holds no usable certificate.
    #[error("unusable trust bundle {}: {reason}", path.display())]
    TrustBundle { path: PathBuf, reason: String },

    /// The outbound HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Only transport-level failures may succeed on retry. Everything else
    /// fails the same way until the credential, token or policy changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {err}"))
        } else {
            Error::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
