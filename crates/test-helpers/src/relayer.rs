// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use async_trait::async_trait;
use fhevm_relayer::{RelayerTransport, TransportError, KEY_URL_PATH};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const MOCK_ENDPOINT: &str = "https://relayer.mock";

/// One request seen by the [`MockRelayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Post { path: String, body: Value },
    Get { path: String },
    Download { url: String },
}

type Reply = Result<Value, TransportError>;

/// Relayer that answers from a script and records every call.
///
/// Replies for a path are consumed in order; the last one is repeated. Unscripted paths answer
/// with a 404.
#[derive(Debug)]
pub struct MockRelayer {
    endpoint: String,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl Default for MockRelayer {
    fn default() -> Self {
        Self::new(MOCK_ENDPOINT)
    }
}

impl MockRelayer {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            replies: Mutex::new(HashMap::new()),
            blobs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Delay every reply. Used to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue `{"response": response}` for `path`.
    pub fn reply(&self, path: &str, response: Value) -> &Self {
        self.push(path, Ok(json!({ "response": response })))
    }

    /// Queue a raw body, without the response envelope.
    pub fn reply_raw(&self, path: &str, body: Value) -> &Self {
        self.push(path, Ok(body))
    }

    pub fn fail(&self, path: &str, error: TransportError) -> &Self {
        self.push(path, Err(error))
    }

    /// Serve `bytes` for downloads of `url`.
    pub fn blob(&self, url: &str, bytes: impl Into<Vec<u8>>) -> &Self {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), bytes.into());
        self
    }

    /// Script a keyurl document with one public key and a CRS, plus their blobs.
    pub fn serve_key_material(&self, key_id: &str, public_key: &[u8], crs: &[u8]) -> &Self {
        let pk_url = format!("{}/storage/{key_id}", self.endpoint);
        let crs_url = format!("{}/storage/crs", self.endpoint);
        self.reply(
            KEY_URL_PATH,
            json!({
                "fhe_key_info": [
                    { "fhe_public_key": { "data_id": key_id, "urls": [pk_url] } }
                ],
                "crs": {
                    "2048": { "data_id": "crs", "urls": [crs_url] }
                }
            }),
        );
        self.blob(&pk_url, public_key.to_vec());
        self.blob(&crs_url, crs.to_vec())
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bodies posted to `path`, oldest first.
    pub fn posted(&self, path: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Post { path: p, body } if p == path => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RecordedCall::Download { .. }))
            .count()
    }

    fn push(&self, path: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    fn record(&self, call: RecordedCall) {
        debug!("mock relayer: {call:?}");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn next_reply(&self, path: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = replies.get_mut(path);
        match queue {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| not_found(path)),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| not_found(path)),
            None => not_found(path),
        }
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), TransportError> {
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        Ok(())
    }
}

fn not_found(path: &str) -> Reply {
    Err(TransportError::Status {
        url: path.to_string(),
        status: 404,
        body: "not scripted".to_string(),
    })
}

#[async_trait]
impl RelayerTransport for MockRelayer {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        self.record(RecordedCall::Post {
            path: path.to_string(),
            body,
        });
        self.wait(cancel).await?;
        self.next_reply(path)
    }

    async fn get_json(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        self.record(RecordedCall::Get {
            path: path.to_string(),
        });
        self.wait(cancel).await?;
        self.next_reply(path)
    }

    async fn get_bytes(
        &self,
        url: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        self.record(RecordedCall::Download {
            url: url.to_string(),
        });
        self.wait(cancel).await?;
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        match blobs.get(url) {
            Some(bytes) if bytes.len() > limit => Err(TransportError::TooLarge {
                url: url.to_string(),
                limit,
            }),
            Some(bytes) => Ok(bytes.clone()),
            None => Err(TransportError::Status {
                url: url.to_string(),
                status: 404,
                body: "not scripted".to_string(),
            }),
        }
    }
}
