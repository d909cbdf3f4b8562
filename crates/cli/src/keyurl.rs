// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::ctrl_c_token;
use anyhow::Result;
use fhevm_config::NetworkConfig;
use fhevm_relayer::{select_key_locations, HttpRelayer, RelayerApi};
use std::sync::Arc;

pub async fn execute(config: &NetworkConfig, key_id: Option<&str>) -> Result<()> {
    let api = RelayerApi::new(Arc::new(HttpRelayer::from_config(config)?));
    let cancel = ctrl_c_token();
    let keys = api.key_urls(&cancel).await?;

    for info in &keys.fhe_key_info {
        println!("public key {}", info.fhe_public_key.data_id);
    }
    for (bits, crs) in &keys.crs {
        println!("crs {} ({bits} bits)", crs.data_id);
    }

    let (public_key, crs) = select_key_locations(&keys, key_id)?;
    println!("selected public key {} and crs {}", public_key.data_id, crs.data_id);
    Ok(())
}
