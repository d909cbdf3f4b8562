// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    Handle, ValidationError, HANDLE_CHAIN_ID_OFFSET, HANDLE_HASH_LEN, HANDLE_INDEX_OFFSET,
    HANDLE_LEN, HANDLE_TYPE_OFFSET, HANDLE_VERSION_OFFSET,
};
use alloy::primitives::{Address, Keccak256, B256};
use fhevm_config::NetworkConfig;
use fhevm_engine::FheType;
use fhevm_utils::u64_to_be32;

/// Domain separators used by the coprocessor when hashing an input list.
pub const DEFAULT_BLOB_TAG: &[u8] = b"ZK-w_rct";
pub const DEFAULT_HANDLE_TAG: &[u8] = b"ZK-w_hdl";

/// Most values one input list can address; the index is a single byte.
pub const MAX_HANDLES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashDomain {
    pub blob_tag: Vec<u8>,
    pub handle_tag: Vec<u8>,
}

impl HashDomain {
    pub fn new(blob_tag: impl Into<Vec<u8>>, handle_tag: impl Into<Vec<u8>>) -> Self {
        Self {
            blob_tag: blob_tag.into(),
            handle_tag: handle_tag.into(),
        }
    }
}

impl Default for HashDomain {
    fn default() -> Self {
        Self::new(DEFAULT_BLOB_TAG, DEFAULT_HANDLE_TAG)
    }
}

/// Computes the handles the coprocessors will assign to an input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleDeriver {
    domain: HashDomain,
    acl: Address,
    chain_id: u64,
    version: u8,
}

impl HandleDeriver {
    pub fn new(acl: Address, chain_id: u64) -> Self {
        Self {
            domain: HashDomain::default(),
            acl,
            chain_id,
            version: 0,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.contracts.acl, config.chain_id).with_version(config.ciphertext_version)
    }

    pub fn with_domain(mut self, domain: HashDomain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn domain(&self) -> &HashDomain {
        &self.domain
    }

    /// `keccak256(blob_tag ∥ blob)`
    pub fn blob_hash(&self, blob: &[u8]) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(&self.domain.blob_tag);
        hasher.update(blob);
        hasher.finalize()
    }

    /// One handle per entry of `types`, in order.
    pub fn derive(&self, blob: &[u8], types: &[FheType]) -> Result<Vec<Handle>, ValidationError> {
        if types.len() > MAX_HANDLES {
            return Err(ValidationError::TooManyValues { limit: MAX_HANDLES });
        }
        let blob_hash = self.blob_hash(blob);
        let chain_id = u64_to_be32(self.chain_id);

        Ok(types
            .iter()
            .enumerate()
            .map(|(index, fhe_type)| {
                let index = index as u8;
                let mut hasher = Keccak256::new();
                hasher.update(&self.domain.handle_tag);
                hasher.update(blob_hash.as_slice());
                hasher.update([index]);
                hasher.update(self.acl.as_slice());
                hasher.update(chain_id);
                let digest = hasher.finalize();

                let mut handle = [0u8; HANDLE_LEN];
                handle[..HANDLE_HASH_LEN].copy_from_slice(&digest[..HANDLE_HASH_LEN]);
                handle[HANDLE_INDEX_OFFSET] = index;
                handle[HANDLE_CHAIN_ID_OFFSET..HANDLE_TYPE_OFFSET].copy_from_slice(&chain_id[24..]);
                handle[HANDLE_TYPE_OFFSET] = fhe_type.tag();
                handle[HANDLE_VERSION_OFFSET] = self.version;
                Handle::from_bytes(handle)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, keccak256};

    const ACL: Address = address!("687820221192C5B662b25367F70076A37bc79b6c");

    fn deriver() -> HandleDeriver {
        HandleDeriver::new(ACL, 11155111)
    }

    #[test]
    fn handle_matches_the_reference_construction() {
        let blob = b"ciphertext list with proof";
        let handles = deriver().derive(blob, &[FheType::Uint32]).unwrap();

        let blob_hash = keccak256([DEFAULT_BLOB_TAG, blob.as_slice()].concat());
        let chain_id = u64_to_be32(11155111);
        let expected_hash = keccak256(
            [
                DEFAULT_HANDLE_TAG,
                blob_hash.as_slice(),
                &[0u8][..],
                ACL.as_slice(),
                chain_id.as_slice(),
            ]
            .concat(),
        );

        let handle = handles[0].as_bytes();
        assert_eq!(&handle[..21], &expected_hash[..21]);
        assert_eq!(handle[21], 0);
        assert_eq!(&handle[22..30], &11155111u64.to_be_bytes());
        assert_eq!(handle[30], FheType::Uint32.tag());
        assert_eq!(handle[31], 0);
    }

    #[test]
    fn derivation_is_deterministic_and_ordered() {
        let types = FheType::ALL.to_vec();
        let first = deriver().derive(b"blob", &types).unwrap();
        let second = deriver().derive(b"blob", &types).unwrap();
        assert_eq!(first, second);

        for (i, (handle, t)) in first.iter().zip(&types).enumerate() {
            assert_eq!(handle.index() as usize, i);
            assert_eq!(handle.fhe_type(), Some(*t));
            assert_eq!(handle.chain_id(), 11155111);
        }
    }

    #[test]
    fn inputs_change_the_hash_prefix() {
        let base = deriver().derive(b"blob", &[FheType::Bool]).unwrap()[0];
        let other_blob = deriver().derive(b"blob2", &[FheType::Bool]).unwrap()[0];
        let other_chain = HandleDeriver::new(ACL, 1)
            .derive(b"blob", &[FheType::Bool])
            .unwrap()[0];
        let other_domain = deriver()
            .with_domain(HashDomain::new(b"a".to_vec(), b"b".to_vec()))
            .derive(b"blob", &[FheType::Bool])
            .unwrap()[0];

        for other in [other_blob, other_chain, other_domain] {
            assert_ne!(&base.as_bytes()[..21], &other.as_bytes()[..21]);
        }
    }

    #[test]
    fn version_is_written_last() {
        let handle = deriver()
            .with_version(3)
            .derive(b"blob", &[FheType::Address])
            .unwrap()[0];
        assert_eq!(handle.version(), 3);
    }

    #[test]
    fn index_must_fit_in_a_byte() {
        let types = vec![FheType::Bool; MAX_HANDLES + 1];
        assert_eq!(
            deriver().derive(b"blob", &types),
            Err(ValidationError::TooManyValues { limit: MAX_HANDLES })
        );
        assert_eq!(
            deriver()
                .derive(b"blob", &vec![FheType::Bool; MAX_HANDLES])
                .unwrap()
                .len(),
            MAX_HANDLES
        );
    }
}
