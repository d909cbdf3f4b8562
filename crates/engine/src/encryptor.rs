// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{EngineError, StagedValue};
use fhevm_utils::ArcBytes;

/// The network's FHE public key and the CRS used to prove well-formedness of input lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyMaterial {
    pub public_key_id: String,
    pub public_key: ArcBytes,
    pub crs_id: String,
    pub crs: ArcBytes,
}

/// Builds a proof-carrying ciphertext list.
///
/// Implementations encrypt `values` in order under `key`, attach a zero-knowledge proof of
/// well-formedness bound to `aad`, and return the serialized blob exactly as the relayer and
/// the coprocessors expect it.
pub trait Encryptor: Send + Sync {
    fn encrypt_with_proof(
        &self,
        key: &PublicKeyMaterial,
        values: &[StagedValue],
        aad: &[u8],
    ) -> Result<Vec<u8>, EngineError>;
}
