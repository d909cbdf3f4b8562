// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use chrono::Utc;
use fhevm_config::NetworkConfig;
use fhevm_sdk::{check_contract_addresses, AuthorizationMessageBuilder};

/// Typed data JSON followed by the signing hash.
pub fn render(
    config: &NetworkConfig,
    public_key: &str,
    contracts: &[String],
    delegate: Option<&str>,
    days: u64,
    start: u64,
) -> Result<String> {
    check_contract_addresses(contracts.len())?;
    let message = AuthorizationMessageBuilder::from_config(config).build(
        public_key,
        contracts,
        start,
        days,
        delegate,
    )?;
    Ok(format!(
        "{}\nsigning hash: {}",
        message.to_json()?,
        message.signing_hash()
    ))
}

pub fn execute(
    config: &NetworkConfig,
    public_key: &str,
    contracts: &[String],
    delegate: Option<&str>,
    days: u64,
    start: Option<u64>,
) -> Result<()> {
    let start = start.unwrap_or_else(|| Utc::now().timestamp().max(0) as u64);
    println!(
        "{}",
        render(config, public_key, contracts, delegate, days, start)?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_deterministic() {
        let config = NetworkConfig::sepolia();
        let contracts = vec!["0x8ba1f109551bd432803012645ac136ddd64dba72".to_string()];
        let a = render(&config, "0xabcd", &contracts, None, 10, 1_700_000_000).unwrap();
        let b = render(&config, "abcd", &contracts, None, 10, 1_700_000_000).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"primaryType\":\"UserDecryptRequestVerification\""));
        assert!(a.contains("signing hash: 0x"));

        let delegated = render(
            &config,
            "0xabcd",
            &contracts,
            Some("0x687820221192c5b662b25367f70076a37bc79b6c"),
            10,
            1_700_000_000,
        )
        .unwrap();
        assert!(delegated.contains("DelegatedUserDecryptRequestVerification"));
        assert_ne!(a, delegated);
    }

    #[test]
    fn rejects_too_many_contracts() {
        let config = NetworkConfig::sepolia();
        let contracts = vec!["0x8ba1f109551bd432803012645ac136ddd64dba72".to_string(); 11];
        assert!(render(&config, "0xabcd", &contracts, None, 1, 0).is_err());
    }
}
