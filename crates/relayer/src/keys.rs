// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{KeyLocation, KeyUrlResult, RelayerApi, RelayerError};
use fhevm_engine::PublicKeyMaterial;
use fhevm_utils::{ArcBytes, SingleFlight};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// CRS entry used for input proofs.
pub const CRS_BITS: &str = "2048";
/// Upper bound on a downloaded public key or CRS.
pub const MAX_KEY_MATERIAL_BYTES: usize = 512 * 1024 * 1024;

/// Pick the public key (the first one, or the one with `key_id`) and the 2048 bit CRS.
pub fn select_key_locations<'a>(
    keys: &'a KeyUrlResult,
    key_id: Option<&str>,
) -> Result<(&'a KeyLocation, &'a KeyLocation), RelayerError> {
    let public_key = match key_id {
        Some(id) => keys
            .fhe_key_info
            .iter()
            .map(|info| &info.fhe_public_key)
            .find(|pk| pk.data_id == id)
            .ok_or_else(|| RelayerError::protocol(format!("no FHE public key with data_id {id}")))?,
        None => keys
            .fhe_key_info
            .first()
            .map(|info| &info.fhe_public_key)
            .ok_or_else(|| RelayerError::protocol("keyurl lists no FHE public key"))?,
    };
    let crs = keys
        .crs
        .get(CRS_BITS)
        .ok_or_else(|| RelayerError::protocol(format!("keyurl lists no {CRS_BITS} bit CRS")))?;
    Ok((public_key, crs))
}

fn first_url(location: &KeyLocation) -> Result<&str, RelayerError> {
    location
        .urls
        .first()
        .map(String::as_str)
        .ok_or_else(|| RelayerError::protocol(format!("no download url for {}", location.data_id)))
}

/// Resolve and download the network public key and CRS.
#[instrument(name = "fetch_key_material", skip_all, fields(endpoint = api.endpoint()))]
pub async fn fetch_key_material(
    api: &RelayerApi,
    key_id: Option<&str>,
    cancel: &CancellationToken,
) -> Result<PublicKeyMaterial, RelayerError> {
    let keys = api.key_urls(cancel).await?;
    let (pk, crs) = select_key_locations(&keys, key_id)?;

    let public_key = api
        .download(first_url(pk)?, MAX_KEY_MATERIAL_BYTES, cancel)
        .await?;
    let crs_bytes = api
        .download(first_url(crs)?, MAX_KEY_MATERIAL_BYTES, cancel)
        .await?;

    info!(
        "fetched public key {} ({} bytes) and CRS {} ({} bytes)",
        pk.data_id,
        public_key.len(),
        crs.data_id,
        crs_bytes.len()
    );

    Ok(PublicKeyMaterial {
        public_key_id: pk.data_id.clone(),
        public_key: ArcBytes::from_bytes(public_key),
        crs_id: crs.data_id.clone(),
        crs: ArcBytes::from_bytes(crs_bytes),
    })
}

/// Key material per relayer endpoint (and requested key id). Concurrent first requests share
/// one download; a failed download is not remembered.
#[derive(Debug, Default)]
pub struct KeyMaterialCache {
    entries: SingleFlight<(String, Option<String>), PublicKeyMaterial>,
}

impl KeyMaterialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        api: &RelayerApi,
        key_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PublicKeyMaterial, RelayerError> {
        let key = (api.endpoint().to_string(), key_id.map(str::to_string));
        self.entries
            .get_or_try_init(&key, || fetch_key_material(api, key_id, cancel))
            .await
    }

    /// Drop everything cached. Returns how many entries were held.
    pub fn clear(&self) -> usize {
        self.entries.drain().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FheKeyInfo, RelayerTransport, TransportError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    fn location(id: &str) -> KeyLocation {
        KeyLocation {
            data_id: id.to_string(),
            urls: vec![format!("https://storage/{id}")],
        }
    }

    fn keyurl() -> KeyUrlResult {
        KeyUrlResult {
            fhe_key_info: vec![
                FheKeyInfo {
                    fhe_public_key: location("pk-a"),
                },
                FheKeyInfo {
                    fhe_public_key: location("pk-b"),
                },
            ],
            crs: [(CRS_BITS.to_string(), location("crs"))].into(),
        }
    }

    #[test]
    fn selects_first_or_requested_key() {
        let keys = keyurl();
        let (pk, crs) = select_key_locations(&keys, None).unwrap();
        assert_eq!(pk.data_id, "pk-a");
        assert_eq!(crs.data_id, "crs");

        let (pk, _) = select_key_locations(&keys, Some("pk-b")).unwrap();
        assert_eq!(pk.data_id, "pk-b");

        let err = select_key_locations(&keys, Some("pk-z")).unwrap_err();
        assert!(matches!(err, RelayerError::Protocol(_)));
    }

    #[test]
    fn missing_crs_is_a_protocol_error() {
        let mut keys = keyurl();
        keys.crs.clear();
        assert!(select_key_locations(&keys, None).is_err());
    }

    /// Serves a fixed keyurl document and echoes the URL as blob content.
    struct Storage {
        downloads: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl RelayerTransport for Storage {
        fn endpoint(&self) -> &str {
            "https://relayer"
        }

        async fn post_json(
            &self,
            path: &str,
            _body: Value,
            _cancel: &CancellationToken,
        ) -> Result<Value, TransportError> {
            Err(TransportError::Status {
                url: path.to_string(),
                status: 404,
                body: String::new(),
            })
        }

        async fn get_json(
            &self,
            _path: &str,
            _cancel: &CancellationToken,
        ) -> Result<Value, TransportError> {
            Ok(json!({ "response": keyurl() }))
        }

        async fn get_bytes(
            &self,
            url: &str,
            _limit: usize,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, TransportError> {
            let n = self.downloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                return Err(TransportError::Timeout {
                    url: url.to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(url.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn concurrent_fetches_download_once() {
        let storage = Arc::new(Storage {
            downloads: AtomicUsize::new(0),
            fail_first: false,
        });
        let api = RelayerApi::new(storage.clone());
        let cache = Arc::new(KeyMaterialCache::new());

        let tasks = (0..8).map(|_| {
            let api = api.clone();
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&api, None, &CancellationToken::new())
                    .await
            })
        });
        for result in futures::future::join_all(tasks).await {
            let material = result.unwrap().unwrap();
            assert_eq!(material.public_key_id, "pk-a");
            assert_eq!(&*material.public_key, b"https://storage/pk-a");
            assert_eq!(&*material.crs, b"https://storage/crs");
        }
        // one public key and one CRS
        assert_eq!(storage.downloads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.clear(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_by_the_next_caller() {
        let storage = Arc::new(Storage {
            downloads: AtomicUsize::new(0),
            fail_first: true,
        });
        let api = RelayerApi::new(storage.clone());
        let cache = KeyMaterialCache::new();
        let cancel = CancellationToken::new();

        let err = cache.get_or_fetch(&api, None, &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            RelayerError::Transport(TransportError::Timeout { .. })
        ));

        let material = cache.get_or_fetch(&api, None, &cancel).await.unwrap();
        assert_eq!(material.crs_id, "crs");
    }
}
