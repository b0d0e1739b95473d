//! HTTP Remote Store
//!
//! Fetches values from another tiercache node over its `GET /get/:key` route.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::{RemoteError, RemoteStore};
use crate::models::GetResponse;

/// Remote store backed by a peer node's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    /// Creates a client for the node at `base_url`, e.g. `http://10.0.0.2:3000`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| RemoteError::Protocol(format!("invalid remote url: {}", err)))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::Protocol(format!(
                "remote url cannot be a base: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RemoteError::Unavailable(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn key_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("get").push(key);
        }
        url
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_remote(&self, key: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .client
            .get(self.key_url(key))
            .send()
            .await
            .map_err(|err| RemoteError::Unavailable(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(RemoteError::NotFound(key.to_string())),
            status if !status.is_success() => {
                return Err(RemoteError::Unavailable(format!(
                    "remote answered {}",
                    status
                )))
            }
            _ => {}
        }

        let body: GetResponse = response
            .json()
            .await
            .map_err(|err| RemoteError::Protocol(err.to_string()))?;

        body.decode_value()
            .map_err(|err| RemoteError::Protocol(format!("bad value encoding: {}", err)))
    }
}
