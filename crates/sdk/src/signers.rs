// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{SdkError, ValidationError};
use alloy::primitives::{Address, Signature, B256};
use derivative::Derivative;
use fhevm_config::SignerRosterConfig;
use fhevm_engine::{EngineError, KmsEngine, KmsSigner, Release, Resource};
use std::collections::HashSet;
use tracing::{debug, info};

/// Check that `recovered` holds at least `threshold` distinct members of `known`.
///
/// Duplicates are an error rather than being collapsed, as is any address outside the roster.
/// The answer does not depend on the order of either list.
pub fn validate_threshold(
    recovered: &[Address],
    known: &[Address],
    threshold: usize,
) -> Result<bool, SdkError> {
    let mut seen = HashSet::with_capacity(recovered.len());
    for address in recovered {
        if !seen.insert(*address) {
            return Err(SdkError::DuplicateSigner(*address));
        }
    }
    let known: HashSet<&Address> = known.iter().collect();
    if let Some(unknown) = recovered.iter().find(|a| !known.contains(a)) {
        return Err(SdkError::UnknownSigner(*unknown));
    }
    Ok(seen.len() >= threshold)
}

/// Recover the signer of an EIP-712 digest from a 65 byte `r ∥ s ∥ v` signature.
pub fn recover_signer(signature: &[u8], digest: &B256) -> Result<Address, SdkError> {
    let sig = Signature::try_from(signature)
        .map_err(|e| SdkError::verification(format!("malformed signature: {e}")))?;
    sig.recover_address_from_prehash(digest)
        .map_err(|e| SdkError::verification(format!("could not recover signer: {e}")))
}

/// Recover every signature over `digest` and require the roster threshold.
pub fn verify_signatures(
    signatures: &[Vec<u8>],
    digest: &B256,
    roster: &SignerRosterConfig,
) -> Result<Vec<Address>, SdkError> {
    let recovered = signatures
        .iter()
        .map(|sig| recover_signer(sig, digest))
        .collect::<Result<Vec<_>, _>>()?;
    if !validate_threshold(&recovered, &roster.signers, roster.threshold)? {
        return Err(SdkError::ThresholdNotReached {
            valid: recovered.len(),
            threshold: roster.threshold,
        });
    }
    Ok(recovered)
}

/// Reject rosters that cannot sign anything.
pub fn require_roster(
    roster: &SignerRosterConfig,
    label: &'static str,
) -> Result<(), ValidationError> {
    if roster.is_empty() || roster.threshold == 0 {
        return Err(ValidationError::EmptyRoster(label));
    }
    Ok(())
}

/// The KMS roster loaded into the KMS engine for the lifetime of a session.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct SignerDirectory<E: KmsEngine> {
    signers: Vec<KmsSigner>,
    threshold: usize,
    #[derivative(Debug = "ignore")]
    loaded: Resource<Vec<E::Signer>>,
}

impl<E: KmsEngine> SignerDirectory<E> {
    /// Load every roster entry, numbering them from 1 in roster order.
    ///
    /// If any entry fails to load, the ones already loaded are released before returning.
    pub fn load(engine: &E, roster: &SignerRosterConfig) -> Result<Self, SdkError> {
        require_roster(roster, "kms_signers")?;
        let signers: Vec<KmsSigner> = roster
            .signers
            .iter()
            .enumerate()
            .map(|(i, address)| KmsSigner {
                index: i + 1,
                address: *address,
            })
            .collect();

        let mut loaded = Vec::with_capacity(signers.len());
        for signer in &signers {
            match engine.load_signer(signer) {
                Ok(handle) => loaded.push(handle),
                Err(e) => {
                    loaded.release()?;
                    return Err(e.into());
                }
            }
        }
        info!(
            "loaded {} KMS signers (threshold {})",
            signers.len(),
            roster.threshold
        );

        Ok(Self {
            signers,
            threshold: roster.threshold,
            loaded: Resource::new("kms signer directory", loaded),
        })
    }

    pub fn signers(&self) -> &[KmsSigner] {
        &self.signers
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address).collect()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Allocate a per-request KMS client bound to this roster.
    pub fn new_client(
        &self,
        engine: &E,
        user_address: Address,
    ) -> Result<Resource<E::Client>, SdkError> {
        let client = self
            .loaded
            .with(|loaded| engine.new_client(loaded, user_address))??;
        Ok(Resource::new("kms client", client))
    }

    /// Apply the roster rules to the signers the engine accepted.
    pub fn check_threshold(&self, recovered: &[Address]) -> Result<(), SdkError> {
        if validate_threshold(recovered, &self.addresses(), self.threshold)? {
            return Ok(());
        }
        Err(SdkError::ThresholdNotReached {
            valid: recovered.len(),
            threshold: self.threshold,
        })
    }

    /// Free the engine-side roster. Returns `false` if that already happened.
    pub fn release(&self) -> Result<bool, EngineError> {
        let released = self.loaded.release()?;
        if released {
            debug!("released KMS signer directory");
        }
        Ok(released)
    }

    pub fn is_released(&self) -> bool {
        self.loaded.is_released()
    }
}
