//! Remote Store Module
//!
//! The second tier behind the local cache. The cache only knows the
//! [`RemoteStore`] capability; transports plug in behind it.

mod gateway;
mod http;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use gateway::FallbackGateway;
pub use http::HttpRemoteStore;

// == Remote Error ==
/// Failure modes of a remote fetch.
///
/// The gateway collapses all of them into a plain miss; the variants only
/// exist so failures can be logged meaningfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote store has no value for the key
    #[error("Key not found in remote store: {0}")]
    NotFound(String),

    /// The remote store could not be reached or answered with a failure
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The remote store did not answer in time
    #[error("Remote fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The remote store answered with something we could not decode
    #[error("Remote protocol error: {0}")]
    Protocol(String),
}

// == Remote Store ==
/// Outbound capability used on a local miss.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn fetch_remote(&self, key: &str) -> Result<Vec<u8>, RemoteError>;
}
