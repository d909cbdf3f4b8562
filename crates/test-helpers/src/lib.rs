// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod encryptor;
mod kms;
mod relayer;
mod signers;

pub use encryptor::*;
pub use kms::*;
pub use relayer::*;
pub use signers::*;
