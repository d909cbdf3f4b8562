// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{RelayerTransport, TransportError};
use async_trait::async_trait;
use fhevm_config::NetworkConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Longest error body kept in [`TransportError::Status`].
const MAX_ERROR_BODY: usize = 2048;

/// [`RelayerTransport`] over HTTPS using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRelayer {
    base_url: String,
    client: Client,
}

impl HttpRelayer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self, TransportError> {
        Self::new(config.relayer_base(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Response, TransportError> {
        trace!("sending request to {url}");
        let response = cancellable(cancel, async {
            request.send().await.map_err(|e| map_reqwest(url, e))
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = cancellable(cancel, async {
                response.text().await.map_err(|e| map_reqwest(url, e))
            })
            .await
            .unwrap_or_default();
            body.truncate(MAX_ERROR_BODY);
            debug!("{url} returned {status}");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_json(
        &self,
        url: &str,
        response: Response,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        cancellable(cancel, async {
            response.json::<Value>().await.map_err(|e| map_reqwest(url, e))
        })
        .await
    }
}

#[async_trait]
impl RelayerTransport for HttpRelayer {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        let response = self
            .send(&url, self.client.post(&url).json(&body), cancel)
            .await?;
        self.read_json(&url, response, cancel).await
    }

    async fn get_json(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        let response = self.send(&url, self.client.get(&url), cancel).await?;
        self.read_json(&url, response, cancel).await
    }

    async fn get_bytes(
        &self,
        url: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        let mut response = self.send(url, self.client.get(url), cancel).await?;
        let too_large = || TransportError::TooLarge {
            url: url.to_string(),
            limit,
        };

        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = cancellable(cancel, async {
            response.chunk().await.map_err(|e| map_reqwest(url, e))
        })
        .await?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        debug!("downloaded {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// Race `fut` against `cancel`.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        res = fut => res,
    }
}

fn map_reqwest(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
