// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::Address;
use fhevm_engine::{
    EngineError, KmsEip712Domain, KmsEngine, KmsSigner, Release, SignedShare, TypedPlaintext,
    UserDecryptionOutcome, UserDecryptionRequest, UserKeyPair,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};
use tracing::trace;

/// Allocation bookkeeping shared by every handle a [`FakeKmsEngine`] hands out.
#[derive(Debug, Default)]
pub struct AllocationCounter {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl AllocationCounter {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Allocations that have not been released yet.
    pub fn live(&self) -> usize {
        self.acquired() - self.released()
    }
}

/// A fake native allocation.
#[derive(Debug)]
pub struct FakeHandle {
    pub kind: &'static str,
    pub address: Option<Address>,
    counter: Arc<AllocationCounter>,
}

impl FakeHandle {
    fn new(kind: &'static str, address: Option<Address>, counter: &Arc<AllocationCounter>) -> Self {
        counter.acquired.fetch_add(1, Ordering::SeqCst);
        trace!("fake {kind} acquired");
        Self {
            kind,
            address,
            counter: counter.clone(),
        }
    }
}

impl Release for FakeHandle {
    fn release(self) -> Result<(), EngineError> {
        self.counter.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What [`FakeKmsEngine::process_user_decryption`] was called with.
#[derive(Debug, Clone)]
pub struct RecordedDecryption {
    pub request: UserDecryptionRequest,
    pub domain: KmsEip712Domain,
    pub shares: Vec<SignedShare>,
}

/// KMS engine that reports a scripted outcome and counts native allocations.
#[derive(Debug, Default)]
pub struct FakeKmsEngine {
    counter: Arc<AllocationCounter>,
    outcome: Mutex<Option<UserDecryptionOutcome>>,
    fail_load_at: Option<usize>,
    fail_process: Option<i32>,
    loads: AtomicUsize,
    recorded: Mutex<Vec<RecordedDecryption>>,
}

impl FakeKmsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report these signers and plaintexts for every decryption.
    pub fn with_outcome(self, signers: Vec<Address>, plaintexts: Vec<TypedPlaintext>) -> Self {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(UserDecryptionOutcome {
                signers,
                plaintexts,
            });
        self
    }

    /// Fail the `n`th (0-based) signer load.
    pub fn failing_load_at(mut self, n: usize) -> Self {
        self.fail_load_at = Some(n);
        self
    }

    pub fn failing_process(mut self, code: i32) -> Self {
        self.fail_process = Some(code);
        self
    }

    pub fn counter(&self) -> &AllocationCounter {
        &self.counter
    }

    pub fn recorded(&self) -> Vec<RecordedDecryption> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KmsEngine for FakeKmsEngine {
    type Signer = FakeHandle;
    type Client = FakeHandle;
    type PublicKey = FakeHandle;
    type PrivateKey = FakeHandle;

    fn generate_keypair(&self) -> Result<UserKeyPair, EngineError> {
        Ok(UserKeyPair::new(vec![0xab; 32], vec![0xcd; 32]))
    }

    fn load_signer(&self, signer: &KmsSigner) -> Result<FakeHandle, EngineError> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load_at == Some(n) {
            return Err(EngineError::native("load_signer", 7));
        }
        Ok(FakeHandle::new("signer", Some(signer.address), &self.counter))
    }

    fn new_client(
        &self,
        signers: &[FakeHandle],
        _user_address: Address,
    ) -> Result<FakeHandle, EngineError> {
        if signers.is_empty() {
            return Err(EngineError::native("new_client", 3));
        }
        Ok(FakeHandle::new("client", None, &self.counter))
    }

    fn load_public_key(&self, _bytes: &[u8]) -> Result<FakeHandle, EngineError> {
        Ok(FakeHandle::new("public key", None, &self.counter))
    }

    fn load_private_key(&self, _bytes: &[u8]) -> Result<FakeHandle, EngineError> {
        Ok(FakeHandle::new("private key", None, &self.counter))
    }

    fn process_user_decryption(
        &self,
        _client: &FakeHandle,
        request: &UserDecryptionRequest,
        domain: &KmsEip712Domain,
        shares: &[SignedShare],
        _public_key: &FakeHandle,
        _private_key: &FakeHandle,
    ) -> Result<UserDecryptionOutcome, EngineError> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedDecryption {
                request: request.clone(),
                domain: domain.clone(),
                shares: shares.to_vec(),
            });
        if let Some(code) = self.fail_process {
            return Err(EngineError::native("process_user_decryption", code));
        }
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| EngineError::native("process_user_decryption", 1))
    }
}
