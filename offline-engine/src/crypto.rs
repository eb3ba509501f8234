//! Cryptographic verifier for offline payment intents
//!
//! Pure functions, no state: Ed25519 verification over the exact byte
//! sequence the device signed, issuer key handling for funding
//! certificates, and intent digests for the counter audit trail.
//!
//! Signatures travel hex-encoded on the wire; verification MUST run over
//! the carried intent bytes, never a re-serialization.

use crate::{Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// Ed25519 key pair (issuer or device)
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Get public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Public key in the hex wire encoding devices register with
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    /// Sign a message, returning the hex wire encoding
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

/// Decode a hex public key, requiring exactly 32 bytes
pub fn decode_public_key(public_key_hex: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| Error::InvalidPublicKey(format!("not hex: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len())))
}

/// Verify a hex Ed25519 signature over the exact signed bytes
pub fn verify_intent(public_key: &[u8; 32], intent: &[u8], signature_hex: &str) -> bool {
    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature_bytes: [u8; 64] = match signature_bytes.as_slice().try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = DalekSignature::from_bytes(&signature_bytes);

    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(intent, &signature).is_ok()
}

/// SHA-256 digest of the signed intent bytes, kept with consumed counters
pub fn intent_digest(intent: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(intent);
    hasher.finalize().into()
}
