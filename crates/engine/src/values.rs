// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use fhevm_utils::formatters::hexf;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Encrypted value types understood by the fhEVM host contracts. The discriminants are the
/// type tags written into byte 30 of every handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FheType {
    Bool = 0,
    Uint8 = 2,
    Uint16 = 3,
    Uint32 = 4,
    Uint64 = 5,
    Uint128 = 6,
    Address = 7,
    Uint256 = 8,
    Bytes64 = 9,
    Bytes128 = 10,
    Bytes256 = 11,
}

impl FheType {
    pub const ALL: [FheType; 11] = [
        FheType::Bool,
        FheType::Uint8,
        FheType::Uint16,
        FheType::Uint32,
        FheType::Uint64,
        FheType::Uint128,
        FheType::Address,
        FheType::Uint256,
        FheType::Bytes64,
        FheType::Bytes128,
        FheType::Bytes256,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Capacity consumed in a ciphertext list. Booleans occupy two bits.
    pub fn bits(self) -> u32 {
        match self {
            FheType::Bool => 2,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
            FheType::Uint128 => 128,
            FheType::Address => 160,
            FheType::Uint256 => 256,
            FheType::Bytes64 => 512,
            FheType::Bytes128 => 1024,
            FheType::Bytes256 => 2048,
        }
    }

    /// Largest number of value bits a plaintext of this type may carry.
    pub fn value_bits(self) -> u32 {
        match self {
            FheType::Bool => 1,
            other => other.bits(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FheType::Bool => "ebool",
            FheType::Uint8 => "euint8",
            FheType::Uint16 => "euint16",
            FheType::Uint32 => "euint32",
            FheType::Uint64 => "euint64",
            FheType::Uint128 => "euint128",
            FheType::Address => "eaddress",
            FheType::Uint256 => "euint256",
            FheType::Bytes64 => "ebytes64",
            FheType::Bytes128 => "ebytes128",
            FheType::Bytes256 => "ebytes256",
        }
    }

    pub fn is_bytes(self) -> bool {
        matches!(
            self,
            FheType::Bytes64 | FheType::Bytes128 | FheType::Bytes256
        )
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown encrypted type '{0}'")]
pub struct UnknownFheType(pub String);

impl FromStr for FheType {
    type Err = UnknownFheType;

    /// Accepts `ebool`, `bool`, `euint8`, `uint8`, `u8`, `eaddress`, `address`, `ebytes64`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let bare = lower.strip_prefix('e').unwrap_or(&lower);
        let bare = match bare.strip_prefix('u') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => {
                format!("uint{rest}")
            }
            _ => bare.to_string(),
        };
        Self::ALL
            .into_iter()
            .find(|t| &t.name()[1..] == bare)
            .ok_or_else(|| UnknownFheType(s.to_string()))
    }
}

/// One plaintext queued for encryption, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedValue {
    pub fhe_type: FheType,
    pub value: BigUint,
}

impl StagedValue {
    pub fn new(fhe_type: FheType, value: BigUint) -> Self {
        Self { fhe_type, value }
    }
}

/// A decrypted value as reported by the KMS engine. `fhe_type` is the raw tag, which may be
/// one this client does not know about.
#[derive(Clone, PartialEq, Eq)]
pub struct TypedPlaintext {
    pub fhe_type: u8,
    /// Big-endian value bytes
    pub bytes: Vec<u8>,
}

impl TypedPlaintext {
    pub fn new(fhe_type: u8, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            fhe_type,
            bytes: bytes.into(),
        }
    }

    pub fn known_type(&self) -> Option<FheType> {
        FheType::from_tag(self.fhe_type)
    }

    pub fn as_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }
}

impl fmt::Debug for TypedPlaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedPlaintext({}, ", self.fhe_type)?;
        hexf(&self.bytes, f)?;
        write!(f, ")")
    }
}
