// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod common;

use alloy::primitives::U256;
use alloy::signers::local::PrivateKeySigner;
use common::Harness;
use fhevm_relayer::PUBLIC_DECRYPT_PATH;
use fhevm_sdk::{
    public_decrypt_hash, DecodedValue, FheType, Handle, SdkError, ValidationError,
    HANDLE_TYPE_OFFSET,
};
use fhevm_test_helpers::{sign_digest_hex, signer_set, FakeKmsEngine};
use fhevm_utils::to_0x_hex;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn handle(fhe_type: FheType, seed: u8) -> Handle {
    let mut bytes = [seed; 32];
    bytes[HANDLE_TYPE_OFFSET] = fhe_type.tag();
    Handle::from_bytes(bytes)
}

fn result_words() -> Vec<u8> {
    let mut words = vec![0u8; 64];
    words[31] = 1;
    words[56..64].copy_from_slice(&7u64.to_be_bytes());
    words
}

fn script(harness: &Harness, handles: &[Handle], signers: &[PrivateKeySigner]) {
    let words = result_words();
    let digest = public_decrypt_hash(
        handles,
        &words,
        harness.config.gateway_chain_id,
        harness.config.contracts.decryption,
    );
    let signatures: Vec<String> = signers
        .iter()
        .map(|s| sign_digest_hex(s, &digest))
        .collect();
    harness.relayer.reply(
        PUBLIC_DECRYPT_PATH,
        json!([{ "decrypted_value": to_0x_hex(&words), "signatures": signatures }]),
    );
}

#[tokio::test]
async fn verifies_kms_signatures_and_decodes_words() {
    let harness = Harness::new(FakeKmsEngine::new());
    let handles = [handle(FheType::Bool, 1), handle(FheType::Uint64, 2)];
    script(&harness, &handles, &harness.kms[..2]);

    let values = harness
        .client()
        .public_decrypt(&handles, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(values.get(&handles[0]), Some(&DecodedValue::Bool(true)));
    assert_eq!(
        values.get(&handles[1]),
        Some(&DecodedValue::Uint {
            bits: 64,
            value: U256::from(7u64)
        })
    );

    let body = &harness.relayer.posted(PUBLIC_DECRYPT_PATH)[0];
    assert_eq!(body["ciphertextHandles"][1], handles[1].to_hex());
    assert_eq!(body["extraData"], "0x00");
}

#[tokio::test]
async fn signatures_from_outside_the_roster_are_rejected() {
    let harness = Harness::new(FakeKmsEngine::new());
    let handles = [handle(FheType::Bool, 1), handle(FheType::Uint64, 2)];
    // the coprocessor keys are not KMS parties
    let outsiders = signer_set(2);
    script(&harness, &handles, &outsiders);

    let err = harness
        .client()
        .public_decrypt(&handles, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err, SdkError::UnknownSigner(outsiders[0].address()));
}

#[tokio::test]
async fn bytes_handles_are_rejected_before_sending() {
    let harness = Harness::new(FakeKmsEngine::new());
    let handles = [handle(FheType::Bytes128, 1)];

    let err = harness
        .client()
        .public_decrypt(&handles, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SdkError::Validation(ValidationError::NotPublicDecryptable {
            fhe_type: FheType::Bytes128
        })
    );
    assert!(harness.relayer.calls().is_empty());
}
