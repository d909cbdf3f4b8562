// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod address;
pub mod formatters;
pub mod hex_utils;
pub mod single_flight;
pub mod utility_types;

pub use address::*;
pub use formatters::*;
pub use hex_utils::*;
pub use single_flight::*;
pub use utility_types::*;
