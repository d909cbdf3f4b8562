// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use fhevm_config::NetworkConfig;
use fhevm_sdk::{FheType, HandleDeriver};
use std::path::Path;

pub fn execute(config: &NetworkConfig, blob: &Path, types: &[FheType]) -> Result<()> {
    let bytes =
        std::fs::read(blob).with_context(|| format!("Could not read {}", blob.display()))?;
    let handles = HandleDeriver::from_config(config).derive(&bytes, types)?;
    for handle in handles {
        println!("{handle}");
    }
    Ok(())
}
