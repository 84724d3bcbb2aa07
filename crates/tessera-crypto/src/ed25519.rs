//! Ed25519 signing and verification (RFC 8032).
//!
//! Ed25519 is the root asymmetric signature algorithm for tessera. It is
//! used for host settings verification, challenge responses, and contract
//! transaction signatures.
//!
//! This module wraps `ed25519-dalek` with tessera-specific types.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// An Ed25519 signing key (private key).
///
/// The wrapped key zeroizes its secret bytes when dropped; every clone
/// carries its own cleanup.
#[derive(Clone)]
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// An Ed25519 verification key (public key).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// An Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a signing key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }

    /// Get the raw bytes of this signing key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(message),
        }
    }
}

impl VerifyingKey {
    /// Create a verifying key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Get the raw bytes of this verifying key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify(message, &signature.inner)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            inner: ed25519_dalek::Signature::from_bytes(bytes),
        }
    }

    /// Get the raw bytes of this signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

/// Overwrite a buffer with zeros.
///
/// Used on the low half of host challenges, which must not survive in
/// memory once the response has been produced.
pub fn secure_wipe(buf: &mut [u8]) {
    buf.zeroize();
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public", &self.verifying_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let sk = SigningKey::generate();
        let msg = b"revision sighash";
        let sig = sk.sign(msg);
        assert!(sk.verifying_key().verify(msg, &sig).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"correct message");
        assert!(sk.verifying_key().verify(b"wrong message", &sig).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign(b"test");
        assert!(sk2.verifying_key().verify(b"test", &sig).is_err());
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let sk = SigningKey::generate();
        let restored = SigningKey::from_bytes(&sk.to_bytes());
        assert_eq!(
            sk.verifying_key().to_bytes(),
            restored.verifying_key().to_bytes()
        );
    }

    #[test]
    fn test_signature_serialization() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"test");
        let restored = Signature::from_bytes(&sig.to_bytes());
        assert_eq!(sig, restored);
    }

    #[test]
    fn test_deterministic_key_derivation() {
        let seed = [42u8; 32];
        let sk1 = SigningKey::from_bytes(&seed);
        let sk2 = SigningKey::from_bytes(&seed);
        assert_eq!(sk1.verifying_key().to_bytes(), sk2.verifying_key().to_bytes());

        let sk3 = SigningKey::from_bytes(&[43u8; 32]);
        assert_ne!(sk1.verifying_key().to_bytes(), sk3.verifying_key().to_bytes());
    }

    #[test]
    fn test_secure_wipe() {
        let mut challenge = [0xAAu8; 32];
        secure_wipe(&mut challenge[..16]);
        assert_eq!(&challenge[..16], &[0u8; 16]);
        assert_eq!(&challenge[16..], &[0xAAu8; 16]);
    }
}
