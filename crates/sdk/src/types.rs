// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ValidationError;
use alloy::primitives::{Address, B256, U256};
use fhevm_engine::FheType;
use fhevm_utils::{decode_hex, parse_address, strip_0x, to_0x_hex};
use num_bigint::BigUint;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

pub const HANDLE_LEN: usize = 32;
/// Bytes `[0, 21)` of a handle come from the handle hash.
pub const HANDLE_HASH_LEN: usize = 21;
pub const HANDLE_INDEX_OFFSET: usize = 21;
pub const HANDLE_CHAIN_ID_OFFSET: usize = 22;
pub const HANDLE_TYPE_OFFSET: usize = 30;
pub const HANDLE_VERSION_OFFSET: usize = 31;

/// 32 byte on-chain reference to an encrypted value.
///
/// ```text
/// [0..21)  hash prefix
/// [21]     index within the input list
/// [22..30) low 8 bytes of the chain id, big-endian
/// [30]     value type tag
/// [31]     ciphertext format version
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle([u8; HANDLE_LEN]);

impl Handle {
    pub fn from_bytes(bytes: [u8; HANDLE_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse 64 hex characters, with or without `0x`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidHandle {
            handle: value.to_string(),
            reason: reason.to_string(),
        };
        if strip_0x(value).len() != HANDLE_LEN * 2 {
            return Err(invalid("expected 32 bytes"));
        }
        let bytes = decode_hex(value).map_err(|_| invalid("not hex"))?;
        let mut out = [0u8; HANDLE_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; HANDLE_LEN] {
        &self.0
    }

    pub fn to_b256(&self) -> B256 {
        B256::from(self.0)
    }

    /// `0x` prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        to_0x_hex(self.0)
    }

    pub fn to_bare_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn index(&self) -> u8 {
        self.0[HANDLE_INDEX_OFFSET]
    }

    pub fn chain_id(&self) -> u64 {
        let mut be = [0u8; 8];
        be.copy_from_slice(&self.0[HANDLE_CHAIN_ID_OFFSET..HANDLE_TYPE_OFFSET]);
        u64::from_be_bytes(be)
    }

    pub fn type_tag(&self) -> u8 {
        self.0[HANDLE_TYPE_OFFSET]
    }

    pub fn fhe_type(&self) -> Option<FheType> {
        FheType::from_tag(self.type_tag())
    }

    /// The type tag, or `InvalidHandle` when it is not one we know.
    pub fn require_type(&self) -> Result<FheType, ValidationError> {
        self.fhe_type().ok_or_else(|| ValidationError::InvalidHandle {
            handle: self.to_hex(),
            reason: format!("unknown type tag {}", self.type_tag()),
        })
    }

    pub fn version(&self) -> u8 {
        self.0[HANDLE_VERSION_OFFSET]
    }
}

impl FromStr for Handle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.to_hex())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Handle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Handle::parse(&value).map_err(D::Error::custom)
    }
}

/// A handle together with the contract allowed to use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract_address: Address,
}

impl HandleContractPair {
    pub fn new(handle: Handle, contract_address: Address) -> Self {
        Self {
            handle,
            contract_address,
        }
    }

    pub fn parse(handle: &str, contract_address: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            handle: Handle::parse(handle)?,
            contract_address: parse_address(contract_address)?,
        })
    }
}

/// Output of a successful input submission, ready to be passed to a contract call.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub input_proof: Vec<u8>,
}

impl EncryptedInput {
    pub fn input_proof_hex(&self) -> String {
        to_0x_hex(&self.input_proof)
    }
}

impl fmt::Debug for EncryptedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedInput")
            .field("handles", &self.handles)
            .field("input_proof_len", &self.input_proof.len())
            .finish()
    }
}

/// A decrypted value interpreted according to its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Bool(bool),
    Uint { bits: u32, value: U256 },
    /// EIP-55 checksummed
    Address(String),
    /// Left padded to the full type width
    Bytes(Vec<u8>),
    /// The KMS reported a type tag this client does not know
    Raw(BigUint),
}

impl DecodedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&str> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Uint { value, .. } => write!(f, "{value}"),
            Self::Address(a) => f.write_str(a),
            Self::Bytes(bytes) => f.write_str(&to_0x_hex(bytes)),
            Self::Raw(value) => write!(f, "{value}"),
        }
    }
}

/// Decrypted values in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptedValues(Vec<(Handle, DecodedValue)>);

impl DecryptedValues {
    pub fn get(&self, handle: &Handle) -> Option<&DecodedValue> {
        self.0.iter().find(|(h, _)| h == handle).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Handle, DecodedValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Handle, DecodedValue)> for DecryptedValues {
    fn from_iter<T: IntoIterator<Item = (Handle, DecodedValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for DecryptedValues {
    type Item = (Handle, DecodedValue);
    type IntoIter = std::vec::IntoIter<(Handle, DecodedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "0x2ad6ea1e6a1f92d0ce6b8d27cb5e29a0f4bd19c9d4000000000000aa36a70500";

    #[test]
    fn reads_handle_layout() {
        let handle = Handle::parse(SAMPLE).unwrap();
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.chain_id(), 11155111);
        assert_eq!(handle.fhe_type(), Some(FheType::Uint64));
        assert_eq!(handle.version(), 0);
        assert_eq!(handle.to_hex(), SAMPLE);
        assert_eq!(Handle::parse(&SAMPLE[2..]).unwrap(), handle);
    }

    #[test]
    fn rejects_bad_handles() {
        assert!(matches!(
            Handle::parse("0x1234"),
            Err(ValidationError::InvalidHandle { .. })
        ));
        let not_hex = format!("0x{}", "zz".repeat(32));
        assert!(Handle::parse(&not_hex).is_err());

        let mut bytes = [0u8; 32];
        bytes[HANDLE_TYPE_OFFSET] = 1;
        assert!(Handle::from_bytes(bytes).require_type().is_err());
    }

    #[test]
    fn handle_serde_uses_hex() {
        let handle = Handle::parse(SAMPLE).unwrap();
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: Handle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }

    #[test]
    fn decoded_values_display() {
        assert_eq!(DecodedValue::Bool(true).to_string(), "true");
        assert_eq!(
            DecodedValue::Uint {
                bits: 32,
                value: U256::from(7)
            }
            .to_string(),
            "7"
        );
        assert_eq!(DecodedValue::Bytes(vec![0, 1]).to_string(), "0x0001");
    }
}
