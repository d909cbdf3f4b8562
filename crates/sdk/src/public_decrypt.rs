// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    check_handle_budget, decode_value, decryption_domain, require_roster, verify_signatures,
    DecryptedValues, Handle, PublicDecryptVerification, SdkError, ValidationError,
    DEFAULT_EXTRA_DATA_HEX,
};
use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::SolStruct;
use fhevm_config::{NetworkConfig, SignerRosterConfig};
use fhevm_relayer::{PublicDecryptRequest, RelayerApi};
use fhevm_utils::decode_hex;
use num_bigint::BigUint;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

const WORD_LEN: usize = 32;

/// Only booleans, unsigned integers and addresses fit in one ABI word.
pub fn check_public_handles(handles: &[Handle]) -> Result<(), ValidationError> {
    if handles.is_empty() {
        return Err(ValidationError::NoHandles);
    }
    for handle in handles {
        let fhe_type = handle.require_type()?;
        if fhe_type.is_bytes() {
            return Err(ValidationError::NotPublicDecryptable { fhe_type });
        }
    }
    check_handle_budget(handles)?;
    Ok(())
}

/// Digest the KMS parties sign for a public decryption result.
///
/// The request carries `extraData = 0x00`, but the parties sign over empty `extraData`.
pub fn public_decrypt_hash(
    handles: &[Handle],
    decrypted_result: &[u8],
    gateway_chain_id: u64,
    decryption: Address,
) -> B256 {
    PublicDecryptVerification {
        ctHandles: handles.iter().map(Handle::to_b256).collect(),
        decryptedResult: Bytes::copy_from_slice(decrypted_result),
        extraData: Bytes::new(),
    }
    .eip712_signing_hash(&decryption_domain(gateway_chain_id, decryption))
}

/// Split the ABI encoded result into one value per handle.
fn decode_words(handles: &[Handle], decrypted: &[u8]) -> Result<DecryptedValues, SdkError> {
    if decrypted.len() != handles.len() * WORD_LEN {
        return Err(SdkError::protocol(format!(
            "decrypted value is {} bytes, expected {} for {} handles",
            decrypted.len(),
            handles.len() * WORD_LEN,
            handles.len()
        )));
    }
    handles
        .iter()
        .zip(decrypted.chunks_exact(WORD_LEN))
        .map(|(handle, word)| -> Result<_, SdkError> {
            let fhe_type = handle.require_type()?;
            let value = decode_value(fhe_type, &BigUint::from_bytes_be(word))?;
            Ok((*handle, value))
        })
        .collect()
}

/// Decrypts handles that contracts marked as publicly decryptable.
pub struct PublicDecryption {
    api: RelayerApi,
    gateway_chain_id: u64,
    decryption: Address,
    kms_signers: SignerRosterConfig,
}

impl PublicDecryption {
    pub fn new(config: &NetworkConfig, api: RelayerApi) -> Self {
        Self {
            api,
            gateway_chain_id: config.gateway_chain_id,
            decryption: config.contracts.decryption,
            kms_signers: config.kms_signers.clone(),
        }
    }

    #[instrument(name = "public_decrypt", skip_all, fields(handles = handles.len()))]
    pub async fn decrypt(
        &self,
        handles: &[Handle],
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        check_public_handles(handles)?;
        require_roster(&self.kms_signers, "kms_signers")?;

        let request = PublicDecryptRequest {
            ciphertext_handles: handles.iter().map(Handle::to_hex).collect(),
            extra_data: DEFAULT_EXTRA_DATA_HEX.to_string(),
        };
        let results = self.api.public_decrypt(&request, cancel).await?;
        let Some(result) = results.into_iter().next() else {
            return Err(SdkError::protocol("relayer returned no public decryption result"));
        };

        let decrypted = decode_hex(&result.decrypted_value)
            .map_err(|e| SdkError::protocol(format!("decrypted value: {e}")))?;
        let signatures = result
            .signatures
            .iter()
            .map(|s| decode_hex(s).map_err(|e| SdkError::protocol(format!("KMS signature: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let digest = public_decrypt_hash(
            handles,
            &decrypted,
            self.gateway_chain_id,
            self.decryption,
        );
        let signers = verify_signatures(&signatures, &digest, &self.kms_signers)?;

        let values = decode_words(handles, &decrypted)?;
        info!(
            "publicly decrypted {} values with {} KMS signatures",
            values.len(),
            signers.len()
        );
        Ok(values)
    }
}
