// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! EIP-712 types signed by users, coprocessors and KMS parties.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::Eip712Domain;
use fhevm_engine::KmsEip712Domain;
use fhevm_utils::u64_to_be32;
use std::borrow::Cow;

pub const DECRYPTION_DOMAIN_NAME: &str = "Decryption";
pub const INPUT_VERIFICATION_DOMAIN_NAME: &str = "InputVerification";
pub const DOMAIN_VERSION: &str = "1";

/// `extraData` sent with every request.
pub const DEFAULT_EXTRA_DATA: &[u8] = &[0x00];
pub const DEFAULT_EXTRA_DATA_HEX: &str = "0x00";

sol! {
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 contractsChainId;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }

    struct DelegatedUserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 contractsChainId;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
        address delegatedAccount;
    }

    struct CiphertextVerification {
        bytes32[] ctHandles;
        address userAddress;
        address contractAddress;
        uint256 contractChainId;
        bytes extraData;
    }

    struct PublicDecryptVerification {
        bytes32[] ctHandles;
        bytes decryptedResult;
        bytes extraData;
    }
}

fn domain(name: &'static str, chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(name)),
        Some(Cow::Borrowed(DOMAIN_VERSION)),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}

/// Domain of the `Decryption` contract. User authorizations are signed with the host chain id,
/// KMS responses with the gateway chain id.
pub fn decryption_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    domain(DECRYPTION_DOMAIN_NAME, chain_id, verifying_contract)
}

/// The decryption domain in the layout the KMS engine consumes.
pub fn kms_decryption_domain(gateway_chain_id: u64, verifying_contract: Address) -> KmsEip712Domain {
    KmsEip712Domain {
        name: DECRYPTION_DOMAIN_NAME.to_string(),
        version: DOMAIN_VERSION.to_string(),
        chain_id: u64_to_be32(gateway_chain_id),
        verifying_contract: verifying_contract.to_checksum(None),
        salt: None,
    }
}

/// Domain of the gateway `InputVerification` contract.
pub fn input_verification_domain(
    gateway_chain_id: u64,
    verifying_contract: Address,
) -> Eip712Domain {
    domain(
        INPUT_VERIFICATION_DOMAIN_NAME,
        gateway_chain_id,
        verifying_contract,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolStruct;

    #[test]
    fn type_strings() {
        assert_eq!(
            UserDecryptRequestVerification::eip712_encode_type(),
            "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 contractsChainId,uint256 startTimestamp,uint256 durationDays,bytes extraData)"
        );
        assert_eq!(
            CiphertextVerification::eip712_encode_type(),
            "CiphertextVerification(bytes32[] ctHandles,address userAddress,address contractAddress,uint256 contractChainId,bytes extraData)"
        );
        assert_eq!(
            PublicDecryptVerification::eip712_encode_type(),
            "PublicDecryptVerification(bytes32[] ctHandles,bytes decryptedResult,bytes extraData)"
        );
    }

    #[test]
    fn domains_differ_by_name() {
        let a = decryption_domain(55815, Address::ZERO);
        let b = input_verification_domain(55815, Address::ZERO);
        assert_ne!(a.separator(), b.separator());
    }
}
