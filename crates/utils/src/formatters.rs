// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

/// Hex formatter for `Debug` impls of large byte blobs (ciphertexts, public keys, CRS).
/// Short values are printed in full, long ones are elided in the middle.
pub fn hexf(data: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", truncate_hex(&hex::encode(data)))
}

fn truncate_hex(s: &str) -> String {
    const THRESHOLD: usize = 100;
    const KEEP: usize = 24;
    if s.len() <= THRESHOLD {
        format!("0x{s}")
    } else {
        format!(
            "<bytes({}):0x{}..{}>",
            s.len() / 2,
            &s[..KEEP],
            &s[s.len() - KEEP..]
        )
    }
}
