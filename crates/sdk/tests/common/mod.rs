// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

#![allow(dead_code)]

use alloy::primitives::{address, Address};
use alloy::signers::local::PrivateKeySigner;
use fhevm_config::NetworkConfig;
use fhevm_sdk::FhevmClient;
use fhevm_test_helpers::{roster, signer_set, FakeEncryptor, FakeKmsEngine, MockRelayer};
use std::sync::Arc;

pub const CONTRACT: Address = address!("8ba1f109551bD432803012645Ac136ddd64DBA72");
pub const USER: Address = address!("0202020202020202020202020202020202020202");
pub const NOW: u64 = 1_750_000_000;

pub struct Harness {
    pub config: NetworkConfig,
    pub relayer: Arc<MockRelayer>,
    pub encryptor: Arc<FakeEncryptor>,
    pub engine: Arc<FakeKmsEngine>,
    pub coprocessors: Vec<PrivateKeySigner>,
    pub kms: Vec<PrivateKeySigner>,
}

impl Harness {
    /// Two coprocessors (both required) and three KMS parties (two required).
    pub fn new(engine: FakeKmsEngine) -> Self {
        let coprocessors = signer_set(2);
        let kms = signer_set(5)[2..].to_vec();
        let mut config = NetworkConfig::sepolia();
        config.coprocessor_signers = roster(&coprocessors, 2);
        config.kms_signers = roster(&kms, 2);
        Self {
            config,
            relayer: Arc::new(MockRelayer::default()),
            encryptor: Arc::new(FakeEncryptor::new()),
            engine: Arc::new(engine),
            coprocessors,
            kms,
        }
    }

    pub fn client(&self) -> FhevmClient<FakeKmsEngine> {
        FhevmClient::new(
            self.config.clone(),
            self.relayer.clone(),
            self.encryptor.clone(),
            self.engine.clone(),
        )
        .with_clock(Arc::new(fhevm_sdk::FixedClock::at_unix(NOW as i64)))
    }
}
