// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Opaque interfaces to the native cryptography used by the fhEVM client.
//!
//! Ciphertext construction, input proofs and KMS share reconstruction live outside this
//! workspace. Everything here is the contract the protocol code programs against, plus the
//! scoped [`Resource`] guard that owns whatever handles a native engine allocates.

mod encryptor;
mod error;
mod kms;
mod resource;
mod values;

pub use encryptor::*;
pub use error::*;
pub use kms::*;
pub use resource::*;
pub use values::*;
