//! Sector Merkle roots over 64-byte segments.
//!
//! A sector is committed to as the root of a binary Merkle tree whose
//! leaves are the sector's 64-byte segments. Leaf and inner hashes are
//! domain-separated so that a leaf can never be confused with an interior
//! node.
//!
//! The host and renter must agree on this root bit for bit; it is the
//! value embedded in every negotiated contract revision.

use crate::hashing;
use crate::SEGMENT_SIZE;
use crate::{CryptoError, Result};

/// Compute a Merkle tree leaf hash with domain separation.
///
/// Leaf nodes use `BLAKE3::hash(0x00 || segment)` to prevent
/// second-preimage attacks.
pub fn merkle_leaf(segment: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(1 + segment.len());
    input.push(0x00);
    input.extend_from_slice(segment);
    hashing::hash(&input)
}

/// Compute a Merkle tree inner node hash with domain separation.
///
/// Inner nodes use `BLAKE3::keyed_hash(K_inner, left || right)` where
/// `K_inner = BLAKE3::derive_key("tessera v1 merkle-inner-node", "")`.
pub fn merkle_inner(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let k_inner = hashing::derive_key(hashing::contexts::MERKLE_INNER_NODE, b"");
    let mut message = [0u8; 64];
    message[..32].copy_from_slice(left);
    message[32..].copy_from_slice(right);
    hashing::keyed_hash(&k_inner, &message)
}

/// Compute the Merkle root of a buffer of 64-byte segments.
///
/// The input length must be a non-zero multiple of [`SEGMENT_SIZE`]. For a
/// full sector the leaf count is a power of two and the tree is perfectly
/// balanced; for shorter multiples the last node of an odd level is
/// promoted unchanged.
pub fn segments_root(data: &[u8]) -> Result<[u8; 32]> {
    if data.is_empty() || data.len() % SEGMENT_SIZE != 0 {
        return Err(CryptoError::InvalidInput(format!(
            "segment buffer length {} is not a non-zero multiple of {SEGMENT_SIZE}",
            data.len()
        )));
    }

    let mut level: Vec<[u8; 32]> = data.chunks(SEGMENT_SIZE).map(merkle_leaf).collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut i = 0;
        while i < level.len() {
            if i + 1 < level.len() {
                next.push(merkle_inner(&level[i], &level[i + 1]));
            } else {
                // Odd node at the end of a level is promoted unchanged.
                next.push(level[i]);
            }
            i += 2;
        }
        level = next;
    }

    Ok(level[0])
}
