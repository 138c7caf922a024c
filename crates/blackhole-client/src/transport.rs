//! Block store transport.
//!
//! [`BlockTransport`] is the seam between the check/upload protocol logic and
//! the wire. [`HttpTransport`] speaks JSON over HTTP with `reqwest`.

use async_trait::async_trait;
use blackhole_reduce::Channel;
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::protocol::{CheckRequest, CheckResponse, UploadRequest};

/// One request per call; no retries.
#[async_trait]
pub trait BlockTransport: Send + Sync {
    /// Ask the store which of `request.hashes` it is missing.
    async fn check(&self, channel: Channel, request: &CheckRequest) -> Result<CheckResponse>;

    /// Store one batch of blocks.
    async fn upload(&self, channel: Channel, request: &UploadRequest) -> Result<()>;
}

/// JSON-over-HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base_url}/check` or `{base_url}/upload`
    pub fn endpoint(&self, action: &str) -> String {
        format!("{}/{}", self.base_url, action)
    }

    async fn post<B: serde::Serialize + Sync>(
        &self,
        action: &str,
        channel: Channel,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(action);
        debug!(url = %url, channel = %channel, "POST");
        let response = self
            .client
            .post(&url)
            .query(&[("type", channel.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network {
                url: url.clone(),
                msg: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl BlockTransport for HttpTransport {
    async fn check(&self, channel: Channel, request: &CheckRequest) -> Result<CheckResponse> {
        let response = self.post("check", channel, request).await?;
        response
            .json::<CheckResponse>()
            .await
            .map_err(|e| ClientError::Network {
                url: self.endpoint("check"),
                msg: format!("invalid check response: {}", e),
            })
    }

    async fn upload(&self, channel: Channel, request: &UploadRequest) -> Result<()> {
        self.post("upload", channel, request).await?;
        Ok(())
    }
}
