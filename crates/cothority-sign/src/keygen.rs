//! Trusted-dealer key generation for the collective signer.
//!
//! The shared ElGamal key `X` from `cothority-dkg` authenticates Structured
//! Consensus; the artifact's final collective signature is a distinct
//! Ed25519/FROST keying, generated here once per roster generation. A
//! production deployment would replace the trusted dealer with FROST's own
//! DKG; this workspace keeps the simpler trusted-dealer path since the rest
//! of the system already assumes an honest-majority setup phase.

use cothority_core::{CothorityError, Result};
use frost_ed25519::keys::{IdentifierList, KeyPackage, PublicKeyPackage};
use rand_core::{CryptoRng, RngCore};
use std::collections::BTreeMap;

/// Generate one [`KeyPackage`] per node plus the shared [`PublicKeyPackage`].
pub fn generate_signing_keys<R: RngCore + CryptoRng>(
    max_signers: u16,
    min_signers: u16,
    rng: &mut R,
) -> Result<(BTreeMap<u16, KeyPackage>, PublicKeyPackage)> {
    let (shares, pubkey_package) =
        frost_ed25519::keys::generate_with_dealer(max_signers, min_signers, IdentifierList::Default, rng)
            .map_err(|e| CothorityError::crypto(format!("FROST dealer keygen failed: {e}")))?;

    let mut packages = BTreeMap::new();
    for (identifier, secret_share) in shares {
        let key_package = KeyPackage::try_from(secret_share)
            .map_err(|e| CothorityError::crypto(format!("invalid FROST secret share: {e}")))?;
        let signer_id = identifier_to_u16(&identifier)?;
        packages.insert(signer_id, key_package);
    }

    Ok((packages, pubkey_package))
}

pub fn identifier_to_u16(identifier: &frost_ed25519::Identifier) -> Result<u16> {
    let bytes = identifier.serialize();
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn u16_to_identifier(signer: u16) -> Result<frost_ed25519::Identifier> {
    frost_ed25519::Identifier::try_from(signer)
        .map_err(|e| CothorityError::crypto(format!("invalid FROST identifier {signer}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn generates_one_key_package_per_signer() {
        let (packages, pubkey_package) = generate_signing_keys(4, 3, &mut OsRng).unwrap();
        assert_eq!(packages.len(), 4);
        assert_eq!(pubkey_package.verifying_shares().len(), 4);
    }
}
