// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    decode_plaintext, kms_decryption_domain, AuthorizationMessage, Clock, DecryptedValues, Handle,
    HandleContractPair, SdkError, SignerDirectory, SystemClock, ValidationError,
    DEFAULT_EXTRA_DATA_HEX,
};
use alloy::primitives::Address;
use fhevm_config::NetworkConfig;
use fhevm_engine::{KmsEngine, Resource, UserDecryptionRequest, UserKeyPair};
use fhevm_relayer::{HandleContractPairWire, RelayerApi, RequestValidity, UserDecryptRequest};
use fhevm_utils::decode_hex;
use std::{fmt, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const MAX_DURATION_DAYS: u64 = 365;
pub const MAX_CONTRACT_ADDRESSES: usize = 10;
pub const MAX_DECRYPT_BITS: u32 = 2048;
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Every handle must carry a known type, and together they may not exceed 2048 bits.
pub fn check_handle_budget<'a>(
    handles: impl IntoIterator<Item = &'a Handle>,
) -> Result<u32, ValidationError> {
    let mut total = 0u32;
    for handle in handles {
        let bits = handle.require_type()?.bits();
        if total + bits > MAX_DECRYPT_BITS {
            return Err(ValidationError::TooManyBits {
                used: total,
                requested: bits,
                limit: MAX_DECRYPT_BITS,
            });
        }
        total += bits;
    }
    Ok(total)
}

/// `duration_days` in `1..=365` and `now` within `[start, start + duration]`.
pub fn check_validity_window(
    start_timestamp: u64,
    duration_days: u64,
    now: u64,
) -> Result<(), ValidationError> {
    if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
        return Err(ValidationError::InvalidDuration {
            days: duration_days,
            max: MAX_DURATION_DAYS,
        });
    }
    if start_timestamp > now {
        return Err(ValidationError::NotYetValid {
            start: start_timestamp,
        });
    }
    if start_timestamp.saturating_add(duration_days * SECONDS_PER_DAY) < now {
        return Err(ValidationError::Expired {
            start: start_timestamp,
            days: duration_days,
        });
    }
    Ok(())
}

pub fn check_contract_addresses(count: usize) -> Result<(), ValidationError> {
    if count == 0 || count > MAX_CONTRACT_ADDRESSES {
        return Err(ValidationError::ContractAddressCount {
            count,
            max: MAX_CONTRACT_ADDRESSES,
        });
    }
    Ok(())
}

/// A user decryption request, as authorized by the user's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionRequest {
    pub pairs: Vec<HandleContractPair>,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
    /// Signature over the authorization message. May be absent for flows where the relayer
    /// obtains it separately.
    pub signature: Option<Vec<u8>>,
}

impl DecryptionRequest {
    /// Take the contract list and validity window from the message the user signed.
    pub fn from_authorization(
        message: &AuthorizationMessage,
        pairs: Vec<HandleContractPair>,
        user_address: Address,
        signature: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let signature = signature.map(decode_hex).transpose()?;
        Ok(Self {
            pairs,
            contract_addresses: message.contract_addresses.clone(),
            user_address,
            start_timestamp: message.start_timestamp,
            duration_days: message.duration_days,
            signature,
        })
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.pairs.iter().map(|p| &p.handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecryptionStage {
    Init,
    Validate,
    BuildPayload,
    Submit,
    AggregateVerify,
    Decode,
    Done,
    Failed,
}

impl fmt::Display for DecryptionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Progress of one decryption through its stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionRun {
    stage: DecryptionStage,
    failed_at: Option<DecryptionStage>,
}

impl Default for DecryptionRun {
    fn default() -> Self {
        Self {
            stage: DecryptionStage::Init,
            failed_at: None,
        }
    }
}

impl DecryptionRun {
    pub fn stage(&self) -> DecryptionStage {
        self.stage
    }

    /// The stage that was running when the request failed.
    pub fn failed_at(&self) -> Option<DecryptionStage> {
        self.failed_at
    }

    fn advance(&mut self, next: DecryptionStage) {
        debug!("decryption stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, err: &SdkError) {
        warn!("decryption failed during {}: {err}", self.stage);
        self.failed_at = Some(self.stage);
        self.stage = DecryptionStage::Failed;
    }
}

/// Runs user decryption against the relayer and the KMS engine.
pub struct ThresholdDecryption<E: KmsEngine> {
    api: RelayerApi,
    engine: Arc<E>,
    chain_id: u64,
    gateway_chain_id: u64,
    decryption: Address,
    clock: Arc<dyn Clock>,
}

impl<E: KmsEngine> ThresholdDecryption<E> {
    pub fn new(config: &NetworkConfig, api: RelayerApi, engine: Arc<E>) -> Self {
        Self {
            api,
            engine,
            chain_id: config.chain_id,
            gateway_chain_id: config.gateway_chain_id,
            decryption: config.contracts.decryption,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn decrypt(
        &self,
        directory: &SignerDirectory<E>,
        keypair: &UserKeyPair,
        request: &DecryptionRequest,
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        self.execute(&mut DecryptionRun::default(), directory, keypair, request, cancel)
            .await
    }

    /// Like [`Self::decrypt`] but records progress in `run`.
    #[instrument(name = "user_decrypt", skip_all, fields(handles = request.pairs.len()))]
    pub async fn execute(
        &self,
        run: &mut DecryptionRun,
        directory: &SignerDirectory<E>,
        keypair: &UserKeyPair,
        request: &DecryptionRequest,
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        let result = self.stages(run, directory, keypair, request, cancel).await;
        match &result {
            Ok(values) => {
                run.advance(DecryptionStage::Done);
                info!("decrypted {} values", values.len());
            }
            Err(e) => run.fail(e),
        }
        result
    }

    async fn stages(
        &self,
        run: &mut DecryptionRun,
        directory: &SignerDirectory<E>,
        keypair: &UserKeyPair,
        request: &DecryptionRequest,
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        run.advance(DecryptionStage::Validate);
        self.validate(request)?;

        run.advance(DecryptionStage::BuildPayload);
        let payload = self.payload(request, keypair);

        run.advance(DecryptionStage::Submit);
        let shares = self.api.user_decrypt(&payload, cancel).await?;
        if cancel.is_cancelled() {
            return Err(SdkError::Cancelled);
        }

        run.advance(DecryptionStage::AggregateVerify);
        if shares.is_empty() {
            return Err(SdkError::ThresholdNotReached {
                valid: 0,
                threshold: directory.threshold(),
            });
        }
        let verification = UserDecryptionRequest {
            signature: request.signature.as_deref().map(hex::encode),
            client_address: payload.user_address.clone(),
            enc_key: payload.public_key.clone(),
            ciphertext_handles: request.handles().map(Handle::to_bare_hex).collect(),
            eip712_verifying_contract: self.decryption.to_checksum(None),
        };
        let domain = kms_decryption_domain(self.gateway_chain_id, self.decryption);

        let engine = self.engine.as_ref();
        let public_key = Resource::new(
            "user public key",
            engine.load_public_key(keypair.public_key())?,
        );
        let private_key = Resource::new(
            "user private key",
            engine.load_private_key(keypair.private_key())?,
        );
        let client = directory.new_client(engine, request.user_address)?;

        let outcome = client.with(|client| {
            public_key.with(|pk| {
                private_key.with(|sk| {
                    engine.process_user_decryption(
                        client,
                        &verification,
                        &domain,
                        &shares,
                        pk,
                        sk,
                    )
                })
            })
        })????;

        client.release()?;
        private_key.release()?;
        public_key.release()?;

        directory.check_threshold(&outcome.signers)?;
        if outcome.plaintexts.len() != request.pairs.len() {
            return Err(SdkError::verification(format!(
                "KMS returned {} plaintexts for {} handles",
                outcome.plaintexts.len(),
                request.pairs.len()
            )));
        }

        run.advance(DecryptionStage::Decode);
        request
            .handles()
            .zip(&outcome.plaintexts)
            .map(|(handle, plaintext)| decode_plaintext(handle, plaintext).map(|v| (*handle, v)))
            .collect()
    }

    fn validate(&self, request: &DecryptionRequest) -> Result<(), ValidationError> {
        if request.pairs.is_empty() {
            return Err(ValidationError::NoHandles);
        }
        check_handle_budget(request.handles())?;
        check_validity_window(
            request.start_timestamp,
            request.duration_days,
            self.clock.unix_now(),
        )?;
        check_contract_addresses(request.contract_addresses.len())
    }

    fn payload(&self, request: &DecryptionRequest, keypair: &UserKeyPair) -> UserDecryptRequest {
        UserDecryptRequest {
            handle_contract_pairs: request
                .pairs
                .iter()
                .map(|p| HandleContractPairWire {
                    handle: p.handle.to_hex(),
                    contract_address: p.contract_address.to_checksum(None),
                })
                .collect(),
            request_validity: RequestValidity {
                start_timestamp: request.start_timestamp.to_string(),
                duration_days: request.duration_days.to_string(),
            },
            contracts_chain_id: self.chain_id.to_string(),
            contract_addresses: request
                .contract_addresses
                .iter()
                .map(|a| a.to_checksum(None))
                .collect(),
            user_address: request.user_address.to_checksum(None),
            signature: request
                .signature
                .as_deref()
                .map(hex::encode)
                .unwrap_or_default(),
            public_key: keypair.public_key_hex(),
            extra_data: DEFAULT_EXTRA_DATA_HEX.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HANDLE_TYPE_OFFSET;
    use fhevm_engine::FheType;

    const NOW: u64 = 1_750_000_000;

    fn handle(fhe_type: FheType) -> Handle {
        let mut bytes = [0u8; 32];
        bytes[HANDLE_TYPE_OFFSET] = fhe_type.tag();
        Handle::from_bytes(bytes)
    }

    #[test]
    fn duration_bounds() {
        assert_eq!(
            check_validity_window(NOW, 0, NOW),
            Err(ValidationError::InvalidDuration { days: 0, max: 365 })
        );
        assert_eq!(
            check_validity_window(NOW, 366, NOW),
            Err(ValidationError::InvalidDuration {
                days: 366,
                max: 365
            })
        );
        assert_eq!(check_validity_window(NOW, 365, NOW), Ok(()));
    }

    #[test]
    fn window_bounds() {
        assert_eq!(
            check_validity_window(NOW + SECONDS_PER_DAY, 1, NOW),
            Err(ValidationError::NotYetValid {
                start: NOW + SECONDS_PER_DAY
            })
        );
        // the last second of the window is still valid
        let start = NOW - 2 * SECONDS_PER_DAY;
        assert_eq!(check_validity_window(start, 2, NOW), Ok(()));
        assert_eq!(
            check_validity_window(start - 1, 2, NOW),
            Err(ValidationError::Expired {
                start: start - 1,
                days: 2
            })
        );
    }

    #[test]
    fn contract_address_count() {
        assert!(check_contract_addresses(0).is_err());
        assert!(check_contract_addresses(1).is_ok());
        assert!(check_contract_addresses(10).is_ok());
        assert_eq!(
            check_contract_addresses(11),
            Err(ValidationError::ContractAddressCount { count: 11, max: 10 })
        );
    }

    #[test]
    fn handle_budget() {
        let big = handle(FheType::Bytes256);
        assert_eq!(check_handle_budget([&big]), Ok(2048));
        assert!(matches!(
            check_handle_budget([&big, &handle(FheType::Bool)]),
            Err(ValidationError::TooManyBits { .. })
        ));

        let mut unknown = [0u8; 32];
        unknown[HANDLE_TYPE_OFFSET] = 99;
        assert!(matches!(
            check_handle_budget([&Handle::from_bytes(unknown)]),
            Err(ValidationError::InvalidHandle { .. })
        ));
    }

    #[test]
    #[tracing_test::traced_test]
    fn stage_tracking() {
        let mut run = DecryptionRun::default();
        assert_eq!(run.stage(), DecryptionStage::Init);
        run.advance(DecryptionStage::Validate);
        run.fail(&SdkError::Cancelled);
        assert_eq!(run.stage(), DecryptionStage::Failed);
        assert_eq!(run.failed_at(), Some(DecryptionStage::Validate));
        assert!(logs_contain("decryption stage Init -> Validate"));
        assert!(logs_contain("decryption failed during Validate"));
    }
}
