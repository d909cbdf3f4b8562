// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, B256};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use fhevm_config::SignerRosterConfig;
use fhevm_utils::to_0x_hex;

/// `n` signers with fixed keys `0x0101..`, `0x0202..` and so on.
pub fn signer_set(n: u8) -> Vec<PrivateKeySigner> {
    (1..=n)
        .map(|i| PrivateKeySigner::from_bytes(&B256::repeat_byte(i)).expect("valid secret key"))
        .collect()
}

pub fn addresses(signers: &[PrivateKeySigner]) -> Vec<Address> {
    signers.iter().map(|s| s.address()).collect()
}

pub fn roster(signers: &[PrivateKeySigner], threshold: usize) -> SignerRosterConfig {
    SignerRosterConfig::new(addresses(signers), threshold)
}

/// 65 byte `r ∥ s ∥ v` signature over a prehashed digest.
pub fn sign_digest(signer: &PrivateKeySigner, digest: &B256) -> Vec<u8> {
    signer
        .sign_hash_sync(digest)
        .expect("signing cannot fail")
        .as_bytes()
        .to_vec()
}

/// Same as [`sign_digest`], hex encoded with `0x`.
pub fn sign_digest_hex(signer: &PrivateKeySigner, digest: &B256) -> String {
    to_0x_hex(sign_digest(signer, digest))
}
