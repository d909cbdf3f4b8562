// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::validation::ValidUrl;
use alloy_primitives::{address, Address};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Contracts involved in input verification and decryption. The first three live on the host
/// chain, the last two on the gateway chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContractAddresses {
    /// ACL contract (host chain). Bound into ciphertext AAD and handle derivation.
    pub acl: Address,
    /// KMSVerifier contract (host chain)
    pub kms_verifier: Address,
    /// InputVerifier contract (host chain)
    pub input_verifier: Address,
    /// Decryption contract (gateway chain). Verifying contract for decryption EIP-712 domains.
    pub decryption: Address,
    /// InputVerification contract (gateway chain). Verifying contract for coprocessor signatures.
    pub input_verification: Address,
}

/// A set of signers with the minimum number that must agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignerRosterConfig {
    #[serde(default)]
    pub signers: Vec<Address>,
    #[serde(default)]
    pub threshold: usize,
}

impl SignerRosterConfig {
    pub fn new(signers: Vec<Address>, threshold: usize) -> Self {
        Self { signers, threshold }
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    fn validate(&self, label: &str) -> Result<()> {
        if self.signers.is_empty() {
            // Rosters are usually read from chain at runtime and may be absent here.
            if self.threshold != 0 {
                bail!("{label}: threshold {} set without any signers", self.threshold);
            }
            return Ok(());
        }
        if self.threshold == 0 || self.threshold > self.signers.len() {
            bail!(
                "{label}: threshold must be between 1 and {} (got {})",
                self.signers.len(),
                self.threshold
            );
        }
        Ok(())
    }
}

/// Everything the client needs to know about one fhEVM deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Human readable name used in logs
    pub name: String,
    /// Base URL of the relayer, without trailing `/v1/...`
    pub relayer_url: String,
    /// Host chain id
    pub chain_id: u64,
    /// Gateway chain id
    pub gateway_chain_id: u64,
    pub contracts: ContractAddresses,
    /// Coprocessors signing input proofs
    #[serde(default)]
    pub coprocessor_signers: SignerRosterConfig,
    /// KMS parties signing decryption responses
    #[serde(default)]
    pub kms_signers: SignerRosterConfig,
    /// Upper bound for every relayer round trip
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Format version written into the last byte of each handle
    #[serde(default)]
    pub ciphertext_version: u8,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl NetworkConfig {
    /// Zama's public Sepolia testnet deployment.
    pub fn sepolia() -> Self {
        Self {
            name: "sepolia".to_string(),
            relayer_url: "https://relayer.testnet.zama.cloud".to_string(),
            chain_id: 11155111,
            gateway_chain_id: 55815,
            contracts: ContractAddresses {
                acl: address!("687820221192C5B662b25367F70076A37bc79b6c"),
                kms_verifier: address!("1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC"),
                input_verifier: address!("bc91f3daD1A5F19F8390c400196e58073B6a0BC4"),
                decryption: address!("b6E160B1ff80D67Bfe90A85eE06Ce0A2613607D1"),
                input_verification: address!("7048C39f048125eDa9d678AEbaDfB22F7900a29F"),
            },
            coprocessor_signers: SignerRosterConfig::default(),
            kms_signers: SignerRosterConfig::default(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            ciphertext_version: 0,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Relayer base URL with any trailing slash removed so endpoint paths can be appended.
    pub fn relayer_base(&self) -> &str {
        self.relayer_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        let url = ValidUrl::from_str(&self.relayer_url)
            .with_context(|| format!("Invalid relayer url '{}'", self.relayer_url))?;
        if !url.is_http() {
            bail!("Relayer url must use http or https: {}", self.relayer_url);
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        self.coprocessor_signers.validate("coprocessor_signers")?;
        self.kms_signers.validate("kms_signers")?;
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::sepolia()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sepolia_preset_is_valid() {
        let config = NetworkConfig::sepolia();
        config.validate().unwrap();
        assert_eq!(config.relayer_base(), "https://relayer.testnet.zama.cloud");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn roster_threshold_bounds() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);

        let mut config = NetworkConfig::sepolia();
        config.kms_signers = SignerRosterConfig::new(vec![a, b], 3);
        assert!(config.validate().is_err());

        config.kms_signers = SignerRosterConfig::new(vec![a, b], 0);
        assert!(config.validate().is_err());

        config.kms_signers = SignerRosterConfig::new(vec![a, b], 2);
        assert!(config.validate().is_ok());

        config.kms_signers = SignerRosterConfig::new(vec![], 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_http_relayer() {
        let mut config = NetworkConfig::sepolia();
        config.relayer_url = "ws://localhost:8545".to_string();
        assert!(config.validate().is_err());

        config.relayer_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
