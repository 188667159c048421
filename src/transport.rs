pub mod auth;
pub mod checksum;
pub mod connection;
pub mod copy;
pub mod decoding;
pub mod file;
pub mod http;
pub mod listing;
pub mod progress;
pub mod url_info;

#[cfg(test)]
mod test_server;

use std::time::Duration;

use async_trait::async_trait;
use hyper::Method;
use serde::Deserialize;
use thiserror::Error;

pub use url_info::{charset_of, UrlInfo, DEFAULT_CHARSET};

/// Faults raised by transfers. Probes never raise these, they report `UrlInfo::UNAVAILABLE`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("The HTTP response code {status} for {url} did not indicate a success. See log for more detail.")]
    NotSuccessful { url: String, status: u16 },
    #[error("Downloaded file size ({actual}) doesn't match expected Content Length ({expected}) for {url}. Please retry.")]
    LengthMismatch { url: String, expected: u64, actual: u64 },
    #[error("{operation} is not supported for {url}: only HTTP and HTTPS are supported at the moment")]
    UnsupportedScheme { url: String, operation: &'static str },
    #[error("more than {max} redirects following {url}")]
    TooManyRedirects { url: String, max: usize },
    #[error("redirect from {url} has no usable Location header")]
    InvalidRedirect { url: String },
    #[error("Access to URL {url} was refused by the server: {message}")]
    AccessRefused { url: String, message: String },
    #[error("PUT operation to URL {url} failed with status code {status}: {message}")]
    PutFailed { url: String, status: u16, message: String },
    #[error("invalid {algorithm} checksum for {url}: expected {expected}, computed {actual}")]
    ChecksumMismatch { url: String, algorithm: &'static str, expected: String, actual: String },
    #[error("timed out after {timeout:?} accessing {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Which request a metadata probe issues. Some servers handle HEAD badly, GET is the
///  workaround.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Head,
    Get,
}
impl RequestMethod {
    pub fn as_method(&self) -> Method {
        match self {
            RequestMethod::Head => Method::HEAD,
            RequestMethod::Get => Method::GET,
        }
    }
}

/// The part of a transport the locator needs: cheap existence and metadata checks.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    /// Never fails - anything that prevents a successful probe is reported as unavailable.
    async fn probe(&self, location: &str) -> UrlInfo;
}

/// Optional capability of a repository to enumerate the children of a location, used to find
///  the concrete revisions a dynamic revision may match.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// Returns the names (not full locations) of the entries directly below `parent`.
    async fn list(&self, parent: &str) -> anyhow::Result<Vec<String>>;
}
