// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DecodedValue, Handle, SdkError};
use alloy::primitives::{Address, U256};
use fhevm_engine::{FheType, TypedPlaintext};
use num_bigint::BigUint;

/// Interpret a big-endian value as `fhe_type`. Fails if it does not fit the type.
pub fn decode_value(fhe_type: FheType, value: &BigUint) -> Result<DecodedValue, SdkError> {
    if value.bits() > u64::from(fhe_type.value_bits()) {
        return Err(SdkError::verification(format!(
            "plaintext does not fit in {fhe_type}"
        )));
    }
    let be = value.to_bytes_be();
    let padded = |width: usize| {
        let mut out = vec![0u8; width.saturating_sub(be.len())];
        out.extend_from_slice(&be);
        out
    };

    Ok(match fhe_type {
        FheType::Bool => DecodedValue::Bool(value.bits() == 1),
        FheType::Address => {
            DecodedValue::Address(Address::from_slice(&padded(20)).to_checksum(None))
        }
        t if t.is_bytes() => DecodedValue::Bytes(padded(t.bits() as usize / 8)),
        t => DecodedValue::Uint {
            bits: t.bits(),
            value: U256::from_be_slice(&be),
        },
    })
}

/// Decode what the KMS returned for `handle`.
///
/// The plaintext's own type tag drives decoding. A tag this client does not know is passed
/// through as a raw integer; a known tag that contradicts the handle is rejected.
pub fn decode_plaintext(
    handle: &Handle,
    plaintext: &TypedPlaintext,
) -> Result<DecodedValue, SdkError> {
    let value = plaintext.as_biguint();
    let Some(fhe_type) = plaintext.known_type() else {
        return Ok(DecodedValue::Raw(value));
    };
    if handle.type_tag() != fhe_type.tag() {
        return Err(SdkError::verification(format!(
            "handle {handle} is {} but the KMS returned {fhe_type}",
            handle
                .fhe_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| format!("type {}", handle.type_tag()))
        )));
    }
    decode_value(fhe_type, &value)
}
