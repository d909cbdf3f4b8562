// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use fhevm_engine::{EngineError, Encryptor, PublicKeyMaterial, StagedValue};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, PoisonError,
};

/// Produces `"fake" ∥ aad ∥ (tag ∥ len ∥ value)*` so that tests can predict the blob and
/// therefore the derived handles.
#[derive(Debug, Default)]
pub struct FakeEncryptor {
    calls: AtomicUsize,
    last_aad: Mutex<Vec<u8>>,
    fail_with: Option<i32>,
}

impl FakeEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with this native code.
    pub fn failing(code: i32) -> Self {
        Self {
            fail_with: Some(code),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_aad(&self) -> Vec<u8> {
        self.last_aad
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The blob [`Encryptor::encrypt_with_proof`] returns for these inputs.
    pub fn blob(values: &[StagedValue], aad: &[u8]) -> Vec<u8> {
        let mut blob = b"fake".to_vec();
        blob.extend_from_slice(aad);
        for value in values {
            let bytes = value.value.to_bytes_be();
            blob.push(value.fhe_type.tag());
            blob.push(bytes.len() as u8);
            blob.extend_from_slice(&bytes);
        }
        blob
    }
}

impl Encryptor for FakeEncryptor {
    fn encrypt_with_proof(
        &self,
        _key: &PublicKeyMaterial,
        values: &[StagedValue],
        aad: &[u8],
    ) -> Result<Vec<u8>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.fail_with {
            return Err(EngineError::native("encrypt_with_proof", code));
        }
        *self.last_aad.lock().unwrap_or_else(PoisonError::into_inner) = aad.to_vec();
        Ok(Self::blob(values, aad))
    }
}
