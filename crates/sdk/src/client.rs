// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    AuthorizationMessage, AuthorizationMessageBuilder, Clock, DecryptedValues, DecryptionRequest,
    EncryptedInput, Handle, HashDomain, InputSubmitter, PublicDecryption, SdkError,
    SignerDirectory, SystemClock, ThresholdDecryption, ValueAccumulator,
};
use derivative::Derivative;
use fhevm_config::NetworkConfig;
use fhevm_engine::{Encryptor, KmsEngine, PublicKeyMaterial, UserKeyPair};
use fhevm_relayer::{HttpRelayer, KeyMaterialCache, RelayerApi, RelayerTransport};
use fhevm_utils::SingleFlight;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Entry point tying one network configuration to its relayer and crypto engines.
///
/// Key material and the KMS signer directory are loaded once per relayer endpoint and shared
/// by every request. [`FhevmClient::shutdown`] frees the engine-side state; afterwards every
/// operation fails with [`SdkError::Closed`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FhevmClient<E: KmsEngine> {
    config: NetworkConfig,
    #[derivative(Debug = "ignore")]
    api: RelayerApi,
    #[derivative(Debug = "ignore")]
    encryptor: Arc<dyn Encryptor>,
    #[derivative(Debug = "ignore")]
    engine: Arc<E>,
    #[derivative(Debug = "ignore")]
    keys: KeyMaterialCache,
    #[derivative(Debug = "ignore")]
    directories: SingleFlight<String, Arc<SignerDirectory<E>>>,
    domain: HashDomain,
    #[derivative(Debug = "ignore")]
    clock: Arc<dyn Clock>,
    shut_down: AtomicBool,
}

impl<E: KmsEngine> FhevmClient<E> {
    pub fn new(
        config: NetworkConfig,
        transport: Arc<dyn RelayerTransport>,
        encryptor: Arc<dyn Encryptor>,
        engine: Arc<E>,
    ) -> Self {
        Self {
            config,
            api: RelayerApi::new(transport),
            encryptor,
            engine,
            keys: KeyMaterialCache::new(),
            directories: SingleFlight::new(),
            domain: HashDomain::default(),
            clock: Arc::new(SystemClock),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Talk to the configured relayer over HTTP.
    pub fn connect(
        config: NetworkConfig,
        encryptor: Arc<dyn Encryptor>,
        engine: Arc<E>,
    ) -> Result<Self, SdkError> {
        let transport = HttpRelayer::from_config(&config)?;
        info!(
            "connecting to {} relayer at {}",
            config.name,
            config.relayer_base()
        );
        Ok(Self::new(config, Arc::new(transport), encryptor, engine))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hash_domain(mut self, domain: HashDomain) -> Self {
        self.domain = domain;
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), SdkError> {
        if self.is_shut_down() {
            return Err(SdkError::Closed);
        }
        Ok(())
    }

    pub fn create_input(&self) -> Result<ValueAccumulator, SdkError> {
        self.ensure_open()?;
        Ok(ValueAccumulator::new())
    }

    /// Network public key and CRS, downloaded once per endpoint and key id.
    pub async fn key_material(
        &self,
        key_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PublicKeyMaterial, SdkError> {
        self.ensure_open()?;
        Ok(self.keys.get_or_fetch(&self.api, key_id, cancel).await?)
    }

    /// Encrypt the staged values for `contract_address` and register them with the relayer.
    pub async fn encrypt(
        &self,
        accumulator: &mut ValueAccumulator,
        contract_address: &str,
        user_address: &str,
        cancel: &CancellationToken,
    ) -> Result<EncryptedInput, SdkError> {
        let key = self.key_material(None, cancel).await?;
        InputSubmitter::new(&self.config, self.api.clone(), self.encryptor.clone())
            .with_domain(self.domain.clone())
            .submit(accumulator, &key, contract_address, user_address, cancel)
            .await
    }

    pub fn generate_keypair(&self) -> Result<UserKeyPair, SdkError> {
        self.ensure_open()?;
        Ok(self.engine.generate_keypair()?)
    }

    /// The message a user signs to allow decryption of their values.
    pub fn authorization<S: AsRef<str>>(
        &self,
        public_key: &str,
        contract_addresses: &[S],
        start_timestamp: u64,
        duration_days: u64,
        delegated_account: Option<&str>,
    ) -> Result<AuthorizationMessage, SdkError> {
        self.ensure_open()?;
        Ok(AuthorizationMessageBuilder::from_config(&self.config).build(
            public_key,
            contract_addresses,
            start_timestamp,
            duration_days,
            delegated_account,
        )?)
    }

    /// The KMS roster for this endpoint, loaded into the engine on first use.
    pub async fn signer_directory(&self) -> Result<Arc<SignerDirectory<E>>, SdkError> {
        self.ensure_open()?;
        let endpoint = self.api.endpoint().to_string();
        self.directories
            .get_or_try_init(&endpoint, || async {
                SignerDirectory::load(self.engine.as_ref(), &self.config.kms_signers).map(Arc::new)
            })
            .await
    }

    pub async fn user_decrypt(
        &self,
        keypair: &UserKeyPair,
        request: &DecryptionRequest,
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        let directory = self.signer_directory().await?;
        ThresholdDecryption::new(&self.config, self.api.clone(), self.engine.clone())
            .with_clock(self.clock.clone())
            .decrypt(&directory, keypair, request, cancel)
            .await
    }

    pub async fn public_decrypt(
        &self,
        handles: &[Handle],
        cancel: &CancellationToken,
    ) -> Result<DecryptedValues, SdkError> {
        self.ensure_open()?;
        PublicDecryption::new(&self.config, self.api.clone())
            .decrypt(handles, cancel)
            .await
    }

    /// Release every signer directory and forget cached key material. Only the first call
    /// does any work.
    pub fn shutdown(&self) -> Result<(), SdkError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut first_err = None;
        let directories = self.directories.drain();
        for directory in &directories {
            if let Err(e) = directory.release() {
                warn!("failed to release signer directory: {e}");
                first_err.get_or_insert(e);
            }
        }
        let keys = self.keys.clear();
        info!(
            "client shut down ({} signer directories, {keys} key sets released)",
            directories.len()
        );
        first_err.map_or(Ok(()), |e| Err(e.into()))
    }
}
