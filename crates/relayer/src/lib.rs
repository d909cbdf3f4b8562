// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod api;
mod error;
mod http;
mod keys;
mod transport;
mod wire;

pub use api::*;
pub use error::*;
pub use http::*;
pub use keys::*;
pub use transport::*;
pub use wire::*;
