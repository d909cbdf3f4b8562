// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{SdkError, ValidationError};
use alloy::primitives::{Address, U256};
use fhevm_engine::{Encryptor, FheType, PublicKeyMaterial, StagedValue};
use fhevm_utils::u64_to_be32;
use num_bigint::BigUint;
use tracing::debug;

/// Capacity of one proven ciphertext list.
pub const MAX_INPUT_BITS: u32 = 2048;
pub const MAX_INPUT_VALUES: usize = 256;

/// Length of the additional authenticated data bound into an input proof.
pub const AAD_LEN: usize = 20 + 20 + 20 + 32;

/// Who may consume an encrypted input and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputBinding {
    pub contract_address: Address,
    pub user_address: Address,
    pub acl_address: Address,
    pub chain_id: u64,
}

impl InputBinding {
    /// `contract ∥ user ∥ acl ∥ chain_id (32 bytes, big-endian)`
    pub fn aad(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(AAD_LEN);
        aad.extend_from_slice(self.contract_address.as_slice());
        aad.extend_from_slice(self.user_address.as_slice());
        aad.extend_from_slice(self.acl_address.as_slice());
        aad.extend_from_slice(&u64_to_be32(self.chain_id));
        aad
    }
}

/// Encrypted list produced by [`ValueAccumulator::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedInput {
    pub blob: Vec<u8>,
    pub types: Vec<FheType>,
}

/// Stages typed plaintexts for one encrypted input. Single use: once finalized, every further
/// push or finalize is rejected.
#[derive(Debug, Clone, Default)]
pub struct ValueAccumulator {
    values: Vec<StagedValue>,
    total_bits: u32,
    finalized: bool,
}

impl ValueAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Nothing changes unless every check passes.
    pub fn push(
        &mut self,
        fhe_type: FheType,
        value: BigUint,
    ) -> Result<&mut Self, ValidationError> {
        if self.finalized {
            return Err(ValidationError::AlreadyFinalized);
        }
        if value.bits() > u64::from(fhe_type.value_bits()) {
            return Err(ValidationError::ValueOutOfRange { fhe_type });
        }
        if self.values.len() >= MAX_INPUT_VALUES {
            return Err(ValidationError::TooManyValues {
                limit: MAX_INPUT_VALUES,
            });
        }
        let requested = fhe_type.bits();
        if self.total_bits + requested > MAX_INPUT_BITS {
            return Err(ValidationError::TooManyBits {
                used: self.total_bits,
                requested,
                limit: MAX_INPUT_BITS,
            });
        }

        self.total_bits += requested;
        self.values.push(StagedValue::new(fhe_type, value));
        Ok(self)
    }

    pub fn add_bool(&mut self, value: bool) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Bool, BigUint::from(u8::from(value)))
    }

    pub fn add_u8(&mut self, value: u8) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Uint8, BigUint::from(value))
    }

    pub fn add_u16(&mut self, value: u16) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Uint16, BigUint::from(value))
    }

    pub fn add_u32(&mut self, value: u32) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Uint32, BigUint::from(value))
    }

    pub fn add_u64(&mut self, value: u64) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Uint64, BigUint::from(value))
    }

    pub fn add_u128(&mut self, value: u128) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Uint128, BigUint::from(value))
    }

    pub fn add_u256(&mut self, value: U256) -> Result<&mut Self, ValidationError> {
        self.push(
            FheType::Uint256,
            BigUint::from_bytes_be(&value.to_be_bytes::<32>()),
        )
    }

    pub fn add_address(&mut self, value: Address) -> Result<&mut Self, ValidationError> {
        self.push(FheType::Address, BigUint::from_bytes_be(value.as_slice()))
    }

    /// Big-endian bytes for one of the `ebytes` types.
    pub fn add_bytes(
        &mut self,
        fhe_type: FheType,
        value: &[u8],
    ) -> Result<&mut Self, ValidationError> {
        if !fhe_type.is_bytes() || value.len() * 8 > fhe_type.bits() as usize {
            return Err(ValidationError::ValueOutOfRange { fhe_type });
        }
        self.push(fhe_type, BigUint::from_bytes_be(value))
    }

    pub fn values(&self) -> &[StagedValue] {
        &self.values
    }

    pub fn types(&self) -> Vec<FheType> {
        self.values.iter().map(|v| v.fhe_type).collect()
    }

    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    /// Encrypt and prove the staged values, bound to `binding`.
    ///
    /// The accumulator is only marked finalized when the engine succeeds.
    pub fn finalize(
        &mut self,
        encryptor: &dyn Encryptor,
        key: &PublicKeyMaterial,
        binding: &InputBinding,
    ) -> Result<FinalizedInput, SdkError> {
        let finalized = self.seal(encryptor, key, binding)?;
        self.finalized = true;
        Ok(finalized)
    }

    /// Encrypt without marking the accumulator finalized. Used by callers that only commit once
    /// the relayer has accepted the list.
    pub(crate) fn seal(
        &self,
        encryptor: &dyn Encryptor,
        key: &PublicKeyMaterial,
        binding: &InputBinding,
    ) -> Result<FinalizedInput, SdkError> {
        if self.finalized {
            return Err(ValidationError::AlreadyFinalized.into());
        }
        if self.values.is_empty() {
            return Err(ValidationError::NoValues.into());
        }

        let blob = encryptor.encrypt_with_proof(key, &self.values, &binding.aad())?;
        debug!(
            "encrypted {} values ({} bits) into {} bytes",
            self.values.len(),
            self.total_bits,
            blob.len()
        );
        Ok(FinalizedInput {
            blob,
            types: self.types(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhevm_engine::EngineError;
    use fhevm_utils::ArcBytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        aad: Mutex<Vec<u8>>,
        fail: bool,
    }

    impl Encryptor for Recording {
        fn encrypt_with_proof(
            &self,
            _key: &PublicKeyMaterial,
            values: &[StagedValue],
            aad: &[u8],
        ) -> Result<Vec<u8>, EngineError> {
            if self.fail {
                return Err(EngineError::native("compact_list_build", 2));
            }
            *self.aad.lock().unwrap() = aad.to_vec();
            Ok(vec![values.len() as u8])
        }
    }

    fn key() -> PublicKeyMaterial {
        PublicKeyMaterial {
            public_key_id: "pk".into(),
            public_key: ArcBytes::from_bytes(vec![1]),
            crs_id: "crs".into(),
            crs: ArcBytes::from_bytes(vec![2]),
        }
    }

    fn binding() -> InputBinding {
        InputBinding {
            contract_address: Address::repeat_byte(0xc0),
            user_address: Address::repeat_byte(0xee),
            acl_address: Address::repeat_byte(0xac),
            chain_id: 9000,
        }
    }

    #[test]
    fn aad_layout() {
        let aad = binding().aad();
        assert_eq!(aad.len(), AAD_LEN);
        assert!(aad[..20].iter().all(|b| *b == 0xc0));
        assert!(aad[20..40].iter().all(|b| *b == 0xee));
        assert!(aad[40..60].iter().all(|b| *b == 0xac));
        assert_eq!(&aad[60..], &u64_to_be32(9000));
    }

    #[test]
    fn capacity_violation_leaves_state_untouched() {
        let mut acc = ValueAccumulator::new();
        acc.add_bytes(FheType::Bytes128, &[0xff; 128]).unwrap();
        acc.add_bytes(FheType::Bytes64, &[0x01; 64]).unwrap();
        acc.add_u256(U256::MAX).unwrap();
        acc.add_u128(u128::MAX).unwrap();
        acc.add_u64(1).unwrap();
        acc.add_u32(2).unwrap();
        acc.add_u16(3).unwrap();
        acc.add_u8(4).unwrap();
        assert_eq!(acc.total_bits(), 2040);

        let err = acc.add_u16(5).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooManyBits {
                used: 2040,
                requested: 16,
                limit: MAX_INPUT_BITS
            }
        );
        assert_eq!(acc.total_bits(), 2040);
        assert_eq!(acc.len(), 8);

        // the remaining 8 bits are still usable
        acc.add_u8(6).unwrap();
        assert_eq!(acc.total_bits(), MAX_INPUT_BITS);
        assert!(acc.add_bool(true).is_err());
    }

    #[test]
    fn value_count_is_bounded() {
        let mut acc = ValueAccumulator::new();
        for _ in 0..MAX_INPUT_VALUES {
            acc.add_bool(false).unwrap();
        }
        assert_eq!(acc.total_bits(), 512);
        assert_eq!(
            acc.add_bool(true).unwrap_err(),
            ValidationError::TooManyValues {
                limit: MAX_INPUT_VALUES
            }
        );
        assert_eq!(acc.len(), MAX_INPUT_VALUES);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut acc = ValueAccumulator::new();
        assert_eq!(
            acc.push(FheType::Uint8, BigUint::from(256u32)).unwrap_err(),
            ValidationError::ValueOutOfRange {
                fhe_type: FheType::Uint8
            }
        );
        assert!(acc.push(FheType::Bool, BigUint::from(2u32)).is_err());
        assert!(acc.add_bytes(FheType::Uint64, &[1]).is_err());
        assert!(acc.add_bytes(FheType::Bytes64, &[1; 65]).is_err());
        assert!(acc.is_empty());
    }

    #[test]
    fn finalize_is_single_use() {
        let encryptor = Recording::default();
        let mut acc = ValueAccumulator::new();
        acc.add_bool(true).unwrap().add_address(Address::ZERO).unwrap();

        let out = acc.finalize(&encryptor, &key(), &binding()).unwrap();
        assert_eq!(out.blob, vec![2]);
        assert_eq!(out.types, vec![FheType::Bool, FheType::Address]);
        assert_eq!(*encryptor.aad.lock().unwrap(), binding().aad());

        assert_eq!(
            acc.add_u8(1).unwrap_err(),
            ValidationError::AlreadyFinalized
        );
        assert_eq!(
            acc.finalize(&encryptor, &key(), &binding()).unwrap_err(),
            SdkError::Validation(ValidationError::AlreadyFinalized)
        );
    }

    #[test]
    fn failed_encryption_can_be_retried() {
        let mut acc = ValueAccumulator::new();
        acc.add_u8(1).unwrap();
        let failing = Recording {
            fail: true,
            ..Default::default()
        };
        let err = acc.finalize(&failing, &key(), &binding()).unwrap_err();
        assert_eq!(
            err,
            SdkError::CryptoEngine(EngineError::native("compact_list_build", 2))
        );
        assert!(!acc.is_finalized());
        assert!(acc
            .finalize(&Recording::default(), &key(), &binding())
            .is_ok());
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut acc = ValueAccumulator::new();
        assert_eq!(
            acc.finalize(&Recording::default(), &key(), &binding())
                .unwrap_err(),
            SdkError::Validation(ValidationError::NoValues)
        );
    }
}
