// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! The relayer is inconsistent about `0x` prefixes (handles come back prefixed, public keys and
//! signatures are sent without). These helpers keep the normalisation in one place.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex string '{value}': {reason}")]
    Invalid { value: String, reason: String },
    #[error("expected {expected} bytes but '{value}' decodes to {actual}")]
    WrongLength {
        value: String,
        expected: usize,
        actual: usize,
    },
}

/// Remove a leading `0x`/`0X` if present.
pub fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Add a `0x` prefix unless one is already there.
pub fn ensure_0x(value: &str) -> String {
    format!("0x{}", strip_0x(value))
}

/// Lowercase hex with a `0x` prefix.
pub fn to_0x_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without prefix.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, HexError> {
    hex::decode(strip_0x(value)).map_err(|e| HexError::Invalid {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Decode hex into a fixed size array.
pub fn decode_hex_array<const N: usize>(value: &str) -> Result<[u8; N], HexError> {
    let bytes = decode_hex(value)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| HexError::WrongLength {
        value: value.to_string(),
        expected: N,
        actual,
    })
}

/// 32 byte big-endian encoding of a u64 (used for chain ids in hashes and AAD).
pub fn u64_to_be32(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}
