//! Workload identity as mounted by the platform.
//!
//! [`IdentityReader`] loads the raw credential and trust bundle from disk.
//! [`decode`] introspects the credential's claims for display only.

mod decoder;
mod reader;

pub use decoder::{SelfReportedIdentity, decode};
pub use reader::{
    IdentityCredential, IdentityReader, SERVICE_CERT_FILENAME, SERVICE_TOKEN_FILENAME,
    TrustBundle,
};
