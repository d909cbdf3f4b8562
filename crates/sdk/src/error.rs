// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::Address;
use fhevm_engine::{EngineError, FheType};
use fhevm_relayer::{RelayerError, TransportError};
use fhevm_utils::{AddressError, HexError};
use thiserror::Error;

/// Local checks. All of these fire before anything is sent to the relayer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    MalformedAddress(#[from] AddressError),
    #[error(transparent)]
    InvalidHex(#[from] HexError),
    #[error("invalid handle {handle}: {reason}")]
    InvalidHandle { handle: String, reason: String },
    #[error("packing {requested} more bits would exceed the {limit} bit limit ({used} used)")]
    TooManyBits {
        used: u32,
        requested: u32,
        limit: u32,
    },
    #[error("cannot hold more than {limit} values")]
    TooManyValues { limit: usize },
    #[error("value does not fit in {fhe_type}")]
    ValueOutOfRange { fhe_type: FheType },
    #[error("no values to encrypt")]
    NoValues,
    #[error("input has already been encrypted")]
    AlreadyFinalized,
    #[error("durationDays must be between 1 and {max} (got {days})")]
    InvalidDuration { days: u64, max: u64 },
    #[error("request starts at {start}, which is in the future")]
    NotYetValid { start: u64 },
    #[error("request started at {start} for {days} days and has expired")]
    Expired { start: u64, days: u64 },
    #[error("between 1 and {max} contract addresses are required (got {count})")]
    ContractAddressCount { count: usize, max: usize },
    #[error("input proof header cannot encode {count} {what}")]
    ProofHeaderOverflow { what: &'static str, count: usize },
    #[error("{fhe_type} values cannot be publicly decrypted")]
    NotPublicDecryptable { fhe_type: FheType },
    #[error("no {0} configured")]
    EmptyRoster(&'static str),
    #[error("at least one handle is required")]
    NoHandles,
}

/// Relayer returned handles that disagree with the locally derived ones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("derived {local} handles but the relayer returned {remote}")]
    CountMismatch { local: usize, remote: usize },
    #[error("handle {index} differs: derived {local}, relayer returned {remote}")]
    HandleMismatch {
        index: usize,
        local: String,
        remote: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(TransportError),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("only {valid} valid signers, {threshold} required")]
    ThresholdNotReached { valid: usize, threshold: usize },
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("signer {0} appears more than once")]
    DuplicateSigner(Address),
    #[error("signer {0} is not part of the roster")]
    UnknownSigner(Address),
    #[error("crypto engine error: {0}")]
    CryptoEngine(#[from] EngineError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("client has been shut down")]
    Closed,
}

impl SdkError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }
}

impl From<TransportError> for SdkError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Cancelled => Self::Cancelled,
            other => Self::Transport(other),
        }
    }
}

impl From<RelayerError> for SdkError {
    fn from(value: RelayerError) -> Self {
        match value {
            RelayerError::Transport(e) => e.into(),
            RelayerError::Protocol(message) => Self::Protocol(message),
        }
    }
}

impl From<AddressError> for SdkError {
    fn from(value: AddressError) -> Self {
        Self::Validation(value.into())
    }
}
