// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Client side of the fhEVM protocol.
//!
//! Encrypted inputs are staged in a [`ValueAccumulator`], encrypted by an external
//! [`fhevm_engine::Encryptor`] and submitted through the relayer by [`InputSubmitter`], which
//! cross-checks every returned handle against [`HandleDeriver`] and verifies the coprocessor
//! signatures before assembling the input proof.
//!
//! Decryption goes the other way: [`AuthorizationMessageBuilder`] produces the EIP-712 message
//! the user signs, [`ThresholdDecryption`] sends it to the relayer and hands the aggregated KMS
//! response to an external [`fhevm_engine::KmsEngine`], and [`validate_threshold`] decides
//! whether enough distinct signers stood behind the result.
//!
//! [`FhevmClient`] wires these together with per-endpoint caches.

mod accumulator;
mod authorization;
mod client;
mod clock;
mod decode;
mod decrypt;
mod eip712;
mod error;
mod handles;
mod input;
mod public_decrypt;
mod signers;
mod types;

pub use accumulator::*;
pub use authorization::*;
pub use client::*;
pub use clock::*;
pub use decode::*;
pub use decrypt::*;
pub use eip712::*;
pub use error::*;
pub use handles::*;
pub use input::*;
pub use public_decrypt::*;
pub use signers::*;
pub use types::*;

pub use fhevm_engine::{FheType, StagedValue, UserKeyPair};
