use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Where the platform mounts the workload's service-account token.
pub const SERVICE_TOKEN_FILENAME: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// Where the platform mounts the cluster root-of-trust bundle.
pub const SERVICE_CERT_FILENAME: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// The workload's bearer identity token, exactly as mounted (minus
/// surrounding whitespace).
///
/// Read fresh for every request because the platform rotates it.
#[derive(Clone)]
pub struct IdentityCredential {
    raw: String,
}

impl IdentityCredential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into().trim().to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Debug for IdentityCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCredential")
            .field("raw", &format_args!("<{} bytes>", self.raw.len()))
            .finish()
    }
}

/// Root certificates used to trust the broker over TLS. Loaded once at
/// startup and never mutated.
#[derive(Debug, Clone)]
pub struct TrustBundle {
    path: PathBuf,
    pem: Vec<u8>,
}

impl TrustBundle {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            pem,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.pem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pem.is_empty()
    }

    /// Parses the bundle into certificates `reqwest` can trust.
    ///
    /// A bundle that does not parse, or parses to nothing, is an error: the
    /// broker would otherwise be dialed without the cluster root.
    pub fn certificates(&self) -> Result<Vec<reqwest::Certificate>> {
        let certs = reqwest::Certificate::from_pem_bundle(&self.pem).map_err(|e| {
            Error::TrustBundle {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        if certs.is_empty() {
            return Err(Error::TrustBundle {
                path: self.path.clone(),
                reason: "no PEM certificates found".to_string(),
            });
        }
        Ok(certs)
    }
}

/// Loads the workload identity from the files the platform mounts.
#[derive(Debug, Clone)]
pub struct IdentityReader {
    token_path: PathBuf,
    ca_path: PathBuf,
}

impl Default for IdentityReader {
    fn default() -> Self {
        Self::new(SERVICE_TOKEN_FILENAME, SERVICE_CERT_FILENAME)
    }
}

impl IdentityReader {
    pub fn new(token_path: impl Into<PathBuf>, ca_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            ca_path: ca_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn ca_path(&self) -> &Path {
        &self.ca_path
    }

    /// Reads the current identity credential.
    ///
    /// Both mounted files must be readable; a partial mount means the process
    /// is not where it thinks it is, so this fails instead of degrading.
    #[tracing::instrument(skip(self), fields(token_path = %self.token_path.display()))]
    pub fn read(&self) -> Result<IdentityCredential> {
        let raw = std::fs::read_to_string(&self.token_path)
            .map_err(|e| Error::io(&self.token_path, e))?;
        std::fs::File::open(&self.ca_path).map_err(|e| Error::io(&self.ca_path, e))?;

        let credential = IdentityCredential::new(raw);
        debug!(bytes = credential.raw().len(), "Identity credential read");
        Ok(credential)
    }

    pub fn read_trust_bundle(&self) -> Result<TrustBundle> {
        TrustBundle::load(&self.ca_path)
    }
}
