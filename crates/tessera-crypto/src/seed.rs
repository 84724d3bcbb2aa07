//! Wallet seed and index-derived signing keys.
//!
//! The split wallet deployment keeps a 32-byte seed in memory and derives
//! one Ed25519 signing key per address index. Derivation is deterministic,
//! so a wallet can be reconstructed from the seed alone.

use zeroize::Zeroize;

use crate::ed25519::SigningKey;
use crate::hashing;

/// A 32-byte wallet seed.
#[derive(Clone)]
pub struct Seed([u8; 32]);

impl Drop for Seed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Seed {
    /// Generate a new random seed.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
        Self(bytes)
    }

    /// Create a seed from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of this seed.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Derive the signing key at the given address index.
    ///
    /// `key = BLAKE3::derive_key("tessera v1 wallet-key", seed || LE64(index))`
    pub fn key_at(&self, index: u64) -> SigningKey {
        let material = hashing::encode_multi_field(&[&self.0, &index.to_le_bytes()]);
        let secret = hashing::derive_key(hashing::contexts::WALLET_KEY, &material);
        SigningKey::from_bytes(&secret)
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}
