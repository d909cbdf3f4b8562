// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use fhevm_sdk::Handle;

pub fn describe(handle: &Handle) -> String {
    let fhe_type = handle
        .fhe_type()
        .map(|t| t.to_string())
        .unwrap_or_else(|| format!("unknown ({})", handle.type_tag()));
    format!(
        "handle:   {}\nindex:    {}\ntype:     {}\nchain id: {}\nversion:  {}",
        handle.to_hex(),
        handle.index(),
        fhe_type,
        handle.chain_id(),
        handle.version()
    )
}

pub fn execute(handle: &str) -> Result<()> {
    let handle = Handle::parse(handle)?;
    println!("{}", describe(&handle));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_packed_fields() {
        let handle =
            Handle::parse("0x2ad6ea1e6a1f92d0ce6b8d27cb5e29a0f4bd19c9d4000000000000aa36a70500")
                .unwrap();
        let out = describe(&handle);
        assert!(out.contains("index:    0"));
        assert!(out.contains("type:     euint64"));
        assert!(out.contains("chain id: 11155111"));
        assert!(out.contains("version:  0"));
    }
}
