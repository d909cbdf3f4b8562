// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! JSON bodies exchanged with the relayer's `/v1` API. Field order is the serialization order.

use fhevm_engine::SignedShare;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INPUT_PROOF_PATH: &str = "/v1/input-proof";
pub const USER_DECRYPT_PATH: &str = "/v1/user-decrypt";
pub const PUBLIC_DECRYPT_PATH: &str = "/v1/public-decrypt";
pub const KEY_URL_PATH: &str = "/v1/keyurl";

/// Every relayer reply wraps its payload in `{"response": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProofRequest {
    /// `0x` prefixed lowercase hex
    pub contract_chain_id: String,
    pub contract_address: String,
    pub user_address: String,
    /// Bare hex
    pub ciphertext_with_input_verification: String,
    pub extra_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProofResult {
    pub handles: Vec<String>,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPairWire {
    pub handle: String,
    pub contract_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestValidity {
    /// Unix seconds, decimal
    pub start_timestamp: String,
    pub duration_days: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle_contract_pairs: Vec<HandleContractPairWire>,
    pub request_validity: RequestValidity,
    pub contracts_chain_id: String,
    pub contract_addresses: Vec<String>,
    pub user_address: String,
    /// Bare hex, empty when the caller has not signed
    pub signature: String,
    /// Bare hex
    pub public_key: String,
    pub extra_data: String,
}

pub type UserDecryptResult = Vec<SignedShare>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDecryptRequest {
    pub ciphertext_handles: Vec<String>,
    pub extra_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDecryptResult {
    /// ABI encoded cleartexts, one 32 byte word per handle
    pub decrypted_value: String,
    pub signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLocation {
    pub data_id: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FheKeyInfo {
    pub fhe_public_key: KeyLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyUrlResult {
    pub fhe_key_info: Vec<FheKeyInfo>,
    /// CRS locations keyed by the maximum proven bit width
    pub crs: BTreeMap<String, KeyLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_proof_request_uses_camel_case() {
        let body = InputProofRequest {
            contract_chain_id: "0xaa36a7".into(),
            contract_address: "0x01".into(),
            user_address: "0x02".into(),
            ciphertext_with_input_verification: "abcd".into(),
            extra_data: "0x00".into(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"contractChainId":"0xaa36a7","contractAddress":"0x01","userAddress":"0x02","ciphertextWithInputVerification":"abcd","extraData":"0x00"}"#
        );
    }

    #[test]
    fn parses_keyurl_response() {
        let raw = json!({
            "response": {
                "fhe_key_info": [
                    {"fhe_public_key": {"data_id": "pk-1", "urls": ["https://keys/pk-1"]}}
                ],
                "crs": {"2048": {"data_id": "crs-1", "urls": ["https://keys/crs-1"]}}
            }
        });
        let parsed: Envelope<KeyUrlResult> = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.response.fhe_key_info[0].fhe_public_key.data_id, "pk-1");
        assert_eq!(parsed.response.crs["2048"].urls, vec!["https://keys/crs-1"]);
    }
}
