//! The sector builder.
//!
//! A builder accumulates variable-length plaintext slices into one 4 MiB
//! sector. Each append pads its data to the next segment boundary with
//! random bytes and encrypts the padded region in place; `finish` fills
//! the tail with random bytes, computes the sector's Merkle root, and
//! stamps it into every pending slice.
//!
//! Encryption and root assignment happen here, in place, because every
//! slice in a sector shares one physical commitment that is only known
//! once the sector is full, and because the upload path cannot afford a
//! copy per append.

use rand::RngCore;

use tessera_crypto::hashing;
use tessera_crypto::merkle;
use tessera_crypto::segment::SegmentKey;
use tessera_types::{Hash, SECTOR_SIZE, SEGMENTS_PER_SECTOR, SEGMENT_SIZE};

use crate::shard::SectorSlice;
use crate::{RenterError, Result};

/// Builds one sector from a series of appends.
///
/// The buffer is owned by exactly one session at a time and reused across
/// sectors via [`SectorBuilder::reset`].
pub struct SectorBuilder {
    sector: Box<[u8; SECTOR_SIZE]>,
    len: usize,
    slices: Vec<SectorSlice>,
}

impl SectorBuilder {
    /// A new, empty builder.
    pub fn new() -> Self {
        Self {
            sector: vec![0u8; SECTOR_SIZE]
                .into_boxed_slice()
                .try_into()
                .expect("sector-sized box"),
            len: 0,
            slices: Vec::new(),
        }
    }

    /// Bytes appended so far, including padding.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still available for appends.
    pub fn remaining(&self) -> usize {
        SECTOR_SIZE - self.len
    }

    /// Discard all appended data and pending slices.
    ///
    /// The buffer contents are not cleared; they are overwritten by the
    /// next append and the random tail fill.
    pub fn reset(&mut self) {
        self.len = 0;
        self.slices.clear();
    }

    /// Append `data`, padding it to the next segment boundary with random
    /// bytes and encrypting the padded region in place.
    ///
    /// The encryption starts at segment index
    /// `chunk_index * SEGMENTS_PER_SECTOR`, which over-allocates index
    /// space per chunk but guarantees that no (key, segment index) pair
    /// is ever reused across chunks.
    ///
    /// The recorded slice reflects the original data: its length and a
    /// checksum of the plaintext.
    pub fn append(&mut self, data: &[u8], key: &SegmentKey, chunk_index: u64) -> Result<()> {
        let padded = data.len().div_ceil(SEGMENT_SIZE) * SEGMENT_SIZE;
        if padded > self.remaining() {
            return Err(RenterError::Overflow {
                len: data.len(),
                padded,
                remaining: self.remaining(),
            });
        }

        let region = &mut self.sector[self.len..self.len + padded];
        region[..data.len()].copy_from_slice(data);
        rand::rngs::OsRng.fill_bytes(&mut region[data.len()..]);

        let start_segment = chunk_index
            .checked_mul(SEGMENTS_PER_SECTOR as u64)
            .ok_or(tessera_crypto::CryptoError::SegmentIndexOutOfRange(
                chunk_index,
            ))?;
        key.encrypt_segments(region, start_segment)?;

        self.slices.push(SectorSlice {
            offset: self.len as u32,
            length: data.len() as u32,
            checksum: hashing::slice_checksum(data),
            merkle_root: [0u8; 32],
        });
        self.len += padded;
        Ok(())
    }

    /// Fill the remaining capacity with random bytes, compute the
    /// sector's Merkle root, stamp it into every pending slice, and
    /// return the completed sector.
    ///
    /// After `finish`, `remaining` is zero; call [`SectorBuilder::reset`]
    /// before building another sector.
    pub fn finish(&mut self) -> &[u8; SECTOR_SIZE] {
        rand::rngs::OsRng.fill_bytes(&mut self.sector[self.len..]);
        self.len = SECTOR_SIZE;

        let root = merkle::segments_root(self.sector.as_slice())
            .expect("a full sector is segment-aligned");
        for slice in &mut self.slices {
            slice.merkle_root = root;
        }
        &self.sector
    }

    /// The slices recorded since the last reset, one per append.
    ///
    /// Only meaningful after [`SectorBuilder::finish`]; before that the
    /// Merkle root of each slice is unset.
    pub fn slices(&self) -> &[SectorSlice] {
        &self.slices
    }
}

impl Default for SectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The sector's Merkle root, recomputed from its contents.
pub fn sector_root(sector: &[u8; SECTOR_SIZE]) -> Hash {
    merkle::segments_root(sector.as_slice()).expect("a full sector is segment-aligned")
}
