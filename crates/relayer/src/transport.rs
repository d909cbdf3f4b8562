// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Raw access to a relayer. `path` arguments are relative to the relayer base URL, `url`
/// arguments are absolute (key material lives on separate storage hosts).
///
/// Implementations must bound every call by a timeout and return
/// [`TransportError::Cancelled`] as soon as `cancel` fires.
#[async_trait]
pub trait RelayerTransport: Send + Sync {
    /// Base URL, used for logging and as cache key.
    fn endpoint(&self) -> &str;

    async fn post_json(
        &self,
        path: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError>;

    async fn get_json(&self, path: &str, cancel: &CancellationToken)
        -> Result<Value, TransportError>;

    /// Download an absolute URL, failing once more than `limit` bytes have been received.
    async fn get_bytes(
        &self,
        url: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError>;
}
