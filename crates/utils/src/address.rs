// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::strip_0x;
use alloy::primitives::Address;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed address '{0}'")]
pub struct AddressError(pub String);

/// True if `value` is 40 hex characters, optionally `0x` prefixed. Mixed case is accepted
/// without checking the EIP-55 checksum, matching what the relayer accepts.
pub fn is_address(value: &str) -> bool {
    let raw = strip_0x(value);
    raw.len() == 40 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn parse_address(value: &str) -> Result<Address, AddressError> {
    if !is_address(value) {
        return Err(AddressError(value.to_string()));
    }
    Address::from_str(value).map_err(|_| AddressError(value.to_string()))
}

/// Normalise any accepted address spelling to its EIP-55 checksum form.
pub fn checksum_address(value: &str) -> Result<String, AddressError> {
    Ok(parse_address(value)?.to_checksum(None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_prefixed_and_bare_addresses() {
        assert!(is_address("0x8ba1f109551bd432803012645ac136ddd64dba72"));
        assert!(is_address("8ba1f109551bd432803012645ac136ddd64dba72"));
        assert!(!is_address("I like turtles."));
        assert!(!is_address("0x8ba1f109551bd432803012645ac136ddd64dba"));
        assert!(!is_address("0x8ba1f109551bd432803012645ac136ddd64dbazz"));
    }

    #[test]
    fn normalises_to_checksum() {
        assert_eq!(
            checksum_address("0x8ba1f109551bd432803012645ac136ddd64dba72").unwrap(),
            "0x8ba1f109551bD432803012645Ac136ddd64DBA72"
        );
        assert_eq!(
            checksum_address("687820221192c5b662b25367f70076a37bc79b6c").unwrap(),
            "0x687820221192C5B662b25367F70076A37bc79b6c"
        );
    }

    #[test]
    fn parses_any_spelling_to_the_same_address() {
        let expected = Address::repeat_byte(0xab);
        for spelling in [
            "0xabababababababababababababababababababab",
            "abababababababababababababababababababab",
            "0xABABABABABABABABABABABABABABABABABABABAB",
            "0xAbabababababababababababababababababAbab",
        ] {
            assert_eq!(parse_address(spelling).unwrap(), expected, "{spelling}");
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_address("0x1234").unwrap_err();
        assert_eq!(err, AddressError("0x1234".to_string()));
    }
}
