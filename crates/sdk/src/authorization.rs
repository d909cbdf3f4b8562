// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    decryption_domain, kms_decryption_domain, DelegatedUserDecryptRequestVerification,
    UserDecryptRequestVerification, ValidationError, DECRYPTION_DOMAIN_NAME, DEFAULT_EXTRA_DATA,
    DOMAIN_VERSION,
};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use fhevm_config::NetworkConfig;
use fhevm_engine::KmsEip712Domain;
use fhevm_utils::{decode_hex, parse_address, to_0x_hex};
use serde::Serialize;
use std::collections::BTreeMap;

/// The request a user signs to let the KMS re-encrypt values under their key.
///
/// This is data only. Signing is left to the caller's wallet, either over [`Self::signing_hash`]
/// or over the `eth_signTypedData_v4` document from [`Self::to_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationMessage {
    /// Host chain id, used in the signed domain
    pub chain_id: u64,
    /// Gateway chain id, used in the domain handed to the KMS engine
    pub gateway_chain_id: u64,
    pub verifying_contract: Address,
    pub public_key: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    pub contracts_chain_id: u64,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub extra_data: Vec<u8>,
    pub delegated_account: Option<Address>,
}

impl AuthorizationMessage {
    pub fn primary_type(&self) -> &'static str {
        if self.delegated_account.is_some() {
            "DelegatedUserDecryptRequestVerification"
        } else {
            "UserDecryptRequestVerification"
        }
    }

    pub fn eip712_domain(&self) -> Eip712Domain {
        decryption_domain(self.chain_id, self.verifying_contract)
    }

    pub fn signing_hash(&self) -> B256 {
        let domain = self.eip712_domain();
        let public_key = Bytes::copy_from_slice(&self.public_key);
        let extra_data = Bytes::copy_from_slice(&self.extra_data);
        match self.delegated_account {
            Some(delegated_account) => DelegatedUserDecryptRequestVerification {
                publicKey: public_key,
                contractAddresses: self.contract_addresses.clone(),
                contractsChainId: U256::from(self.contracts_chain_id),
                startTimestamp: U256::from(self.start_timestamp),
                durationDays: U256::from(self.duration_days),
                extraData: extra_data,
                delegatedAccount: delegated_account,
            }
            .eip712_signing_hash(&domain),
            None => UserDecryptRequestVerification {
                publicKey: public_key,
                contractAddresses: self.contract_addresses.clone(),
                contractsChainId: U256::from(self.contracts_chain_id),
                startTimestamp: U256::from(self.start_timestamp),
                durationDays: U256::from(self.duration_days),
                extraData: extra_data,
            }
            .eip712_signing_hash(&domain),
        }
    }

    /// Domain in the layout the KMS engine verifies against.
    pub fn kms_domain(&self) -> KmsEip712Domain {
        kms_decryption_domain(self.gateway_chain_id, self.verifying_contract)
    }

    pub fn typed_data(&self) -> TypedData {
        let member = |name: &'static str, ty: &'static str| TypeMember { name, ty };
        let mut message_type = vec![
            member("publicKey", "bytes"),
            member("contractAddresses", "address[]"),
            member("contractsChainId", "uint256"),
            member("startTimestamp", "uint256"),
            member("durationDays", "uint256"),
            member("extraData", "bytes"),
        ];
        if self.delegated_account.is_some() {
            message_type.push(member("delegatedAccount", "address"));
        }

        let types = BTreeMap::from([
            (
                "EIP712Domain",
                vec![
                    member("name", "string"),
                    member("version", "string"),
                    member("chainId", "uint256"),
                    member("verifyingContract", "address"),
                ],
            ),
            (self.primary_type(), message_type),
        ]);

        TypedData {
            types,
            primary_type: self.primary_type(),
            domain: TypedDataDomain {
                name: DECRYPTION_DOMAIN_NAME,
                version: DOMAIN_VERSION,
                chain_id: self.chain_id,
                verifying_contract: self.verifying_contract.to_checksum(None),
            },
            message: TypedDataMessage {
                public_key: to_0x_hex(&self.public_key),
                contract_addresses: self
                    .contract_addresses
                    .iter()
                    .map(|a| a.to_checksum(None))
                    .collect(),
                contracts_chain_id: self.contracts_chain_id.to_string(),
                start_timestamp: self.start_timestamp.to_string(),
                duration_days: self.duration_days.to_string(),
                extra_data: to_0x_hex(&self.extra_data),
                delegated_account: self.delegated_account.map(|a| a.to_checksum(None)),
            },
        }
    }

    /// Deterministic `eth_signTypedData_v4` JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.typed_data())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMember {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataMessage {
    pub public_key: String,
    pub contract_addresses: Vec<String>,
    pub contracts_chain_id: String,
    pub start_timestamp: String,
    pub duration_days: String,
    pub extra_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegated_account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<&'static str, Vec<TypeMember>>,
    pub primary_type: &'static str,
    pub domain: TypedDataDomain,
    pub message: TypedDataMessage,
}

/// Assembles [`AuthorizationMessage`]s for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationMessageBuilder {
    gateway_chain_id: u64,
    verifying_contract: Address,
    contracts_chain_id: u64,
}

impl AuthorizationMessageBuilder {
    pub fn new(gateway_chain_id: u64, verifying_contract: Address, contracts_chain_id: u64) -> Self {
        Self {
            gateway_chain_id,
            verifying_contract,
            contracts_chain_id,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            config.gateway_chain_id,
            config.contracts.decryption,
            config.chain_id,
        )
    }

    /// Every address is checked; `public_key` is hex with or without `0x`.
    pub fn build<S: AsRef<str>>(
        &self,
        public_key: &str,
        contract_addresses: &[S],
        start_timestamp: u64,
        duration_days: u64,
        delegated_account: Option<&str>,
    ) -> Result<AuthorizationMessage, ValidationError> {
        let public_key = decode_hex(public_key)?;
        let contract_addresses = contract_addresses
            .iter()
            .map(|a| parse_address(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let delegated_account = delegated_account.map(parse_address).transpose()?;

        Ok(AuthorizationMessage {
            chain_id: self.contracts_chain_id,
            gateway_chain_id: self.gateway_chain_id,
            verifying_contract: self.verifying_contract,
            public_key,
            contract_addresses,
            contracts_chain_id: self.contracts_chain_id,
            start_timestamp,
            duration_days,
            extra_data: DEFAULT_EXTRA_DATA.to_vec(),
            delegated_account,
        })
    }
}
