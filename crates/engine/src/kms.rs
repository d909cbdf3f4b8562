// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{EngineError, Release, TypedPlaintext};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// The requester's ephemeral encryption key pair. KMS parties encrypt their shares to the
/// public half; the private half never leaves the process and is wiped on drop.
#[derive(Clone)]
pub struct UserKeyPair {
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl UserKeyPair {
    pub fn new(public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            public_key,
            private_key: Zeroizing::new(private_key),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Public key as bare hex, the form the relayer and the EIP-712 message use.
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

impl fmt::Debug for UserKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// A KMS party as registered on chain. Indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KmsSigner {
    pub index: usize,
    pub address: Address,
}

/// One party's contribution to an aggregated user-decryption response, hex as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedShare {
    pub payload: String,
    pub signature: String,
}

/// What the KMS parties were asked to do, as the engine needs it to check their signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecryptionRequest {
    /// Requester signature over the authorization message, bare hex
    pub signature: Option<String>,
    pub client_address: String,
    /// Requester public key, bare hex
    pub enc_key: String,
    /// Handles, bare hex
    pub ciphertext_handles: Vec<String>,
    pub eip712_verifying_contract: String,
}

/// Authorization domain in the layout the KMS engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsEip712Domain {
    pub name: String,
    pub version: String,
    /// Chain id as 32 big-endian bytes
    pub chain_id: [u8; 32],
    pub verifying_contract: String,
    pub salt: Option<Vec<u8>>,
}

/// Result of share reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecryptionOutcome {
    /// Addresses whose shares carried a valid signature, in response order
    pub signers: Vec<Address>,
    /// One plaintext per requested handle, in request order
    pub plaintexts: Vec<TypedPlaintext>,
}

/// The KMS side of user decryption.
///
/// Every native allocation is exposed as an associated type so that callers can hold it in a
/// [`crate::Resource`] and release it deterministically.
pub trait KmsEngine: Send + Sync {
    /// A roster entry loaded into the engine. Lives as long as the signer directory.
    type Signer: Release;
    /// Per-request verification context.
    type Client: Release;
    type PublicKey: Release;
    type PrivateKey: Release;

    fn generate_keypair(&self) -> Result<UserKeyPair, EngineError>;

    fn load_signer(&self, signer: &KmsSigner) -> Result<Self::Signer, EngineError>;

    /// Allocate a client for one requester against the loaded roster.
    fn new_client(
        &self,
        signers: &[Self::Signer],
        user_address: Address,
    ) -> Result<Self::Client, EngineError>;

    fn load_public_key(&self, bytes: &[u8]) -> Result<Self::PublicKey, EngineError>;

    fn load_private_key(&self, bytes: &[u8]) -> Result<Self::PrivateKey, EngineError>;

    /// Verify each share's signature against the roster, decrypt the valid ones with the
    /// requester's key pair and combine them into one plaintext per handle.
    fn process_user_decryption(
        &self,
        client: &Self::Client,
        request: &UserDecryptionRequest,
        domain: &KmsEip712Domain,
        shares: &[SignedShare],
        public_key: &Self::PublicKey,
        private_key: &Self::PrivateKey,
    ) -> Result<UserDecryptionOutcome, EngineError>;
}
