//! Cryptographic primitives: Ed25519 channel signatures and 65-byte
//! recoverable ECDSA signatures for bridge/authority signing.
//!
//! Grounded on `gillean::crypto::KeyPair` (Ed25519 key pair shape) and on
//! the wider corpus's use of `k256` with the `ecdsa` feature for
//! secp256k1 recoverable signatures (e.g. `NerfedChou-Quantum-Chain`'s
//! workspace dependencies).

use ed25519_dalek::{Signature as EdSignature, Signer, SigningKey, Verifier, VerifyingKey};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey as EcdsaSigningKey};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::VerifyingKey as EcdsaVerifyingKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynnergyError};
use crate::types::Address;

/// An Ed25519 key pair used for channel-party signatures.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        KeyPair { signing_key }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> Address {
        Address::derive(&self.public_key())
    }

    /// 64-byte Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> ChannelSignature {
        let sig: EdSignature = self.signing_key.sign(message);
        ChannelSignature {
            bytes: sig.to_bytes().to_vec(),
            public_key: self.public_key().to_vec(),
        }
    }
}

/// 64-byte Ed25519 signature plus the 32-byte public key of the signer,
/// used for state-channel party signatures (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSignature {
    pub bytes: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl ChannelSignature {
    pub fn verify(&self, message: &[u8]) -> Result<bool> {
        let pk_arr: [u8; 32] = self
            .public_key
            .clone()
            .try_into()
            .map_err(|_| SynnergyError::InvalidInput("public key must be 32 bytes".into()))?;
        let sig_arr: [u8; 64] = self
            .bytes
            .clone()
            .try_into()
            .map_err(|_| SynnergyError::InvalidInput("signature must be 64 bytes".into()))?;
        let verifying_key = VerifyingKey::from_bytes(&pk_arr)
            .map_err(|e| SynnergyError::ProofInvalid(e.to_string()))?;
        let signature = EdSignature::from_bytes(&sig_arr);
        Ok(verifying_key.verify(message, &signature).is_ok())
    }

    /// Address derived from the embedded public key, for comparing against
    /// a declared party address.
    pub fn signer_address(&self) -> Address {
        Address::derive(&self.public_key)
    }
}

/// 65-byte recoverable ECDSA signature (r ‖ s ‖ v) used for authority and
/// bridge relayer signing, with `v` normalised to {0, 1} (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    pub bytes: [u8; 65],
}

impl RecoverableSignature {
    pub fn sign(signing_key: &EcdsaSigningKey, digest: &[u8; 32]) -> Result<Self> {
        let (signature, recovery_id): (EcdsaSignature, RecoveryId) = signing_key
            .sign_prehash(digest)
            .map_err(|e| SynnergyError::InvalidInput(e.to_string()))?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature { bytes })
    }

    /// Recover the signer's verifying key from a prehashed message digest.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<EcdsaVerifyingKey> {
        let signature = EcdsaSignature::from_slice(&self.bytes[..64])
            .map_err(|e| SynnergyError::ProofInvalid(e.to_string()))?;
        let recovery_id = RecoveryId::from_byte(self.bytes[64])
            .ok_or_else(|| SynnergyError::ProofInvalid("bad recovery id".into()))?;
        EcdsaVerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| SynnergyError::ProofInvalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_signature_round_trips() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"hello channel");
        assert!(sig.verify(b"hello channel").unwrap());
        assert!(!sig.verify(b"tampered").unwrap());
        assert_eq!(sig.signer_address(), kp.address());
    }

    #[test]
    fn recoverable_signature_recovers_signer() {
        let signing_key = EcdsaSigningKey::random(&mut OsRng);
        let digest = crate::types::Hash::of(b"authority action").0;
        let sig = RecoverableSignature::sign(&signing_key, &digest).unwrap();
        let recovered = sig.recover(&digest).unwrap();
        assert_eq!(recovered, *signing_key.verifying_key());
    }
}
