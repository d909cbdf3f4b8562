// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    input_verification_domain, require_roster, verify_signatures, CiphertextVerification,
    EncryptedInput, Handle, HandleDeriver, HashDomain, InputBinding, IntegrityError, SdkError,
    ValidationError, ValueAccumulator, DEFAULT_EXTRA_DATA, DEFAULT_EXTRA_DATA_HEX, HANDLE_LEN,
};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolStruct;
use fhevm_config::{NetworkConfig, SignerRosterConfig};
use fhevm_engine::{Encryptor, PublicKeyMaterial};
use fhevm_relayer::{InputProofRequest, InputProofResult, RelayerApi};
use fhevm_utils::{decode_hex, decode_hex_array, parse_address};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const SIGNATURE_LEN: usize = 65;

/// `count(handles) ∥ count(signatures) ∥ handles ∥ signatures ∥ extra_data`
pub fn build_input_proof(
    handles: &[Handle],
    signatures: &[Vec<u8>],
    extra_data: &[u8],
) -> Result<Vec<u8>, ValidationError> {
    let handle_count = u8::try_from(handles.len()).map_err(|_| {
        ValidationError::ProofHeaderOverflow {
            what: "handles",
            count: handles.len(),
        }
    })?;
    let signature_count = u8::try_from(signatures.len()).map_err(|_| {
        ValidationError::ProofHeaderOverflow {
            what: "signatures",
            count: signatures.len(),
        }
    })?;

    let mut proof = Vec::with_capacity(
        2 + handles.len() * HANDLE_LEN + signatures.len() * SIGNATURE_LEN + extra_data.len(),
    );
    proof.push(handle_count);
    proof.push(signature_count);
    for handle in handles {
        proof.extend_from_slice(handle.as_bytes());
    }
    for signature in signatures {
        proof.extend_from_slice(signature);
    }
    proof.extend_from_slice(extra_data);
    Ok(proof)
}

/// Local and relayer handles must agree exactly, in order.
pub fn check_handles(local: &[Handle], remote: &[Handle]) -> Result<(), IntegrityError> {
    if local.len() != remote.len() {
        return Err(IntegrityError::CountMismatch {
            local: local.len(),
            remote: remote.len(),
        });
    }
    match local.iter().zip(remote).position(|(l, r)| l != r) {
        Some(index) => Err(IntegrityError::HandleMismatch {
            index,
            local: local[index].to_hex(),
            remote: remote[index].to_hex(),
        }),
        None => Ok(()),
    }
}

/// Digest the coprocessors sign for an accepted input list.
pub fn ciphertext_verification_hash(
    handles: &[Handle],
    user_address: Address,
    contract_address: Address,
    chain_id: u64,
    gateway_chain_id: u64,
    input_verification: Address,
) -> B256 {
    CiphertextVerification {
        ctHandles: handles.iter().map(Handle::to_b256).collect(),
        userAddress: user_address,
        contractAddress: contract_address,
        contractChainId: U256::from(chain_id),
        extraData: Bytes::from_static(DEFAULT_EXTRA_DATA),
    }
    .eip712_signing_hash(&input_verification_domain(
        gateway_chain_id,
        input_verification,
    ))
}

fn parse_response(result: &InputProofResult) -> Result<(Vec<Handle>, Vec<Vec<u8>>), SdkError> {
    let handles = result
        .handles
        .iter()
        .map(|h| {
            decode_hex_array::<HANDLE_LEN>(h)
                .map(Handle::from_bytes)
                .map_err(|e| SdkError::protocol(format!("relayer handle: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let signatures = result
        .signatures
        .iter()
        .map(|s| {
            let bytes =
                decode_hex(s).map_err(|e| SdkError::protocol(format!("relayer signature: {e}")))?;
            if bytes.len() != SIGNATURE_LEN {
                return Err(SdkError::protocol(format!(
                    "relayer signature is {} bytes, expected {SIGNATURE_LEN}",
                    bytes.len()
                )));
            }
            Ok(bytes)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((handles, signatures))
}

/// Encrypts an accumulator, has the relayer register it and returns the contract call inputs.
pub struct InputSubmitter {
    api: RelayerApi,
    encryptor: Arc<dyn Encryptor>,
    deriver: HandleDeriver,
    acl: Address,
    chain_id: u64,
    gateway_chain_id: u64,
    input_verification: Address,
    coprocessors: SignerRosterConfig,
}

impl InputSubmitter {
    pub fn new(config: &NetworkConfig, api: RelayerApi, encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            api,
            encryptor,
            deriver: HandleDeriver::from_config(config),
            acl: config.contracts.acl,
            chain_id: config.chain_id,
            gateway_chain_id: config.gateway_chain_id,
            input_verification: config.contracts.input_verification,
            coprocessors: config.coprocessor_signers.clone(),
        }
    }

    pub fn with_domain(mut self, domain: HashDomain) -> Self {
        self.deriver = self.deriver.with_domain(domain);
        self
    }

    pub fn deriver(&self) -> &HandleDeriver {
        &self.deriver
    }

    /// Run the full submission. The accumulator is marked finalized only once the relayer's
    /// answer has been verified, so a failed or cancelled submission can be retried with it.
    #[instrument(name = "submit_input", skip_all, fields(contract = contract_address, user = user_address))]
    pub async fn submit(
        &self,
        accumulator: &mut ValueAccumulator,
        key: &PublicKeyMaterial,
        contract_address: &str,
        user_address: &str,
        cancel: &CancellationToken,
    ) -> Result<EncryptedInput, SdkError> {
        let contract = parse_address(contract_address)?;
        let user = parse_address(user_address)?;
        require_roster(&self.coprocessors, "coprocessor_signers")?;
        if cancel.is_cancelled() {
            return Err(SdkError::Cancelled);
        }

        let binding = InputBinding {
            contract_address: contract,
            user_address: user,
            acl_address: self.acl,
            chain_id: self.chain_id,
        };
        let finalized = accumulator.seal(self.encryptor.as_ref(), key, &binding)?;
        let local = self.deriver.derive(&finalized.blob, &finalized.types)?;
        debug!("derived {} handles", local.len());

        let request = InputProofRequest {
            contract_chain_id: format!("0x{:x}", self.chain_id),
            contract_address: contract.to_checksum(None),
            user_address: user.to_checksum(None),
            ciphertext_with_input_verification: hex::encode(&finalized.blob),
            extra_data: DEFAULT_EXTRA_DATA_HEX.to_string(),
        };
        let response = self.api.input_proof(&request, cancel).await?;
        let (remote, signatures) = parse_response(&response)?;

        if let Err(e) = check_handles(&local, &remote) {
            warn!("relayer handles do not match local derivation: {e}");
            return Err(e.into());
        }

        let digest = ciphertext_verification_hash(
            &remote,
            user,
            contract,
            self.chain_id,
            self.gateway_chain_id,
            self.input_verification,
        );
        let signers = verify_signatures(&signatures, &digest, &self.coprocessors)?;

        let input_proof = build_input_proof(&local, &signatures, DEFAULT_EXTRA_DATA)?;
        accumulator.mark_finalized();
        info!(
            "input accepted: {} handles, {} coprocessor signatures",
            local.len(),
            signers.len()
        );
        Ok(EncryptedInput {
            handles: local,
            input_proof,
        })
    }
}
