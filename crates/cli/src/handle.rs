// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use clap::Subcommand;
use fhevm_config::NetworkConfig;
use fhevm_sdk::FheType;
use std::path::PathBuf;

use crate::{handle_derive, handle_inspect};

#[derive(Subcommand, Debug)]
pub enum HandleCommands {
    /// Decode the fields packed into a handle
    Inspect {
        /// 32 byte handle, hex
        handle: String,
    },
    /// Derive the handles for an encrypted input blob
    Derive {
        /// File holding the serialized ciphertext list
        #[arg(long)]
        blob: PathBuf,

        /// Comma separated value types in list order, e.g. `u8,bool,address`
        #[arg(long, value_delimiter = ',', required = true)]
        types: Vec<FheType>,
    },
}

pub fn execute(command: HandleCommands, config: &NetworkConfig) -> Result<()> {
    match command {
        HandleCommands::Inspect { handle } => handle_inspect::execute(&handle)?,
        HandleCommands::Derive { blob, types } => handle_derive::execute(config, &blob, &types)?,
    };

    Ok(())
}
