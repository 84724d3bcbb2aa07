//! Domain-separated BLAKE3 hashing for the tessera renter.
//!
//! BLAKE3 serves several distinct purposes: sector Merkle trees, slice
//! checksums, unlock hashes, transaction sighashes, and key derivation.
//! Cross-domain collisions are prevented by mandatory domain separation
//! using BLAKE3's built-in mode flags.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: slice checksums, identifiers
//! - [`derive_key`] — Key derivation: per-host encryption keys, wallet keys
//! - [`keyed_hash`] — Keyed MAC/PRF: Merkle inner nodes, sighashes

/// Registered BLAKE3 context strings. Using an unregistered context string
/// is a protocol violation.
pub mod contexts {
    pub const MERKLE_INNER_NODE: &str = "tessera v1 merkle-inner-node";
    pub const UNLOCK_HASH: &str = "tessera v1 unlock-hash";
    pub const SIG_HASH: &str = "tessera v1 sig-hash";
    pub const SLICE_CHECKSUM: &str = "tessera v1 slice-checksum";
    pub const WALLET_KEY: &str = "tessera v1 wallet-key";
    pub const SHARD_ENCRYPTION_KEY: &str = "tessera v1 shard-encryption-key";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[
        MERKLE_INNER_NODE,
        UNLOCK_HASH,
        SIG_HASH,
        SLICE_CHECKSUM,
        WALLET_KEY,
        SHARD_ENCRYPTION_KEY,
    ];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// The context string must be one of the registered context strings in
/// [`contexts`]. The key material can be any byte slice.
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
///
/// The key must be exactly 32 bytes, typically derived via [`derive_key`].
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Compute the checksum stored alongside a sector slice.
///
/// The checksum covers the original plaintext, before padding and
/// encryption, so that a decrypted download can be verified end to end.
pub fn slice_checksum(data: &[u8]) -> [u8; 32] {
    let key = derive_key(contexts::SLICE_CHECKSUM, b"");
    keyed_hash(&key, data)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// When deriving keys from multiple dynamic fields, inputs use
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
