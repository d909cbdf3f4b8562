// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Envelope, InputProofRequest, InputProofResult, KeyUrlResult, PublicDecryptRequest,
    PublicDecryptResult, RelayerError, RelayerTransport, UserDecryptRequest, UserDecryptResult,
    INPUT_PROOF_PATH, KEY_URL_PATH, PUBLIC_DECRYPT_PATH, USER_DECRYPT_PATH,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Typed calls on top of a [`RelayerTransport`].
#[derive(Clone)]
pub struct RelayerApi {
    transport: Arc<dyn RelayerTransport>,
}

impl RelayerApi {
    pub fn new(transport: Arc<dyn RelayerTransport>) -> Self {
        Self { transport }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn transport(&self) -> &Arc<dyn RelayerTransport> {
        &self.transport
    }

    pub async fn input_proof(
        &self,
        request: &InputProofRequest,
        cancel: &CancellationToken,
    ) -> Result<InputProofResult, RelayerError> {
        self.post(INPUT_PROOF_PATH, request, cancel).await
    }

    pub async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
        cancel: &CancellationToken,
    ) -> Result<UserDecryptResult, RelayerError> {
        self.post(USER_DECRYPT_PATH, request, cancel).await
    }

    pub async fn public_decrypt(
        &self,
        request: &PublicDecryptRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<PublicDecryptResult>, RelayerError> {
        self.post(PUBLIC_DECRYPT_PATH, request, cancel).await
    }

    pub async fn key_urls(&self, cancel: &CancellationToken) -> Result<KeyUrlResult, RelayerError> {
        let raw = self.transport.get_json(KEY_URL_PATH, cancel).await?;
        unwrap_envelope(KEY_URL_PATH, raw)
    }

    pub async fn download(
        &self,
        url: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RelayerError> {
        Ok(self.transport.get_bytes(url, limit, cancel).await?)
    }

    async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<R, RelayerError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| RelayerError::protocol(format!("could not encode {path} body: {e}")))?;
        debug!("POST {}{}", self.endpoint(), path);
        let raw = self.transport.post_json(path, body, cancel).await?;
        unwrap_envelope(path, raw)
    }
}

fn unwrap_envelope<R: DeserializeOwned>(path: &str, raw: Value) -> Result<R, RelayerError> {
    serde_json::from_value::<Envelope<R>>(raw)
        .map(|envelope| envelope.response)
        .map_err(|e| RelayerError::protocol(format!("{path}: {e}")))
}
