//! The shard index file.
//!
//! A shard records, per chunk index, which slice of which sector holds
//! that chunk's data on one host. The file is sparse with a fixed 72-byte
//! stride: record `i` lives at byte offset `i * 72`, and an all-zero
//! record means the chunk has not been uploaded to this host. Records may
//! be overwritten freely, which makes retransmission after a failure
//! safe.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use tessera_types::Hash;
use tessera_wire::{Decoder, Encoder, WireDecode, WireEncode};

use crate::{RenterError, Result};

/// Encoded size of one slice record:
/// `u32 offset + u32 length + 32-byte checksum + 32-byte merkle root`.
pub const SLICE_LEN: usize = 4 + 4 + 32 + 32;

/// One logical piece of plaintext embedded in a physical sector.
///
/// `offset` and `length` describe the unpadded original within the
/// sector; `checksum` covers the plaintext for post-decrypt verification;
/// `merkle_root` is the containing sector's commitment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSlice {
    pub offset: u32,
    pub length: u32,
    pub checksum: Hash,
    pub merkle_root: Hash,
}

impl SectorSlice {
    /// Whether this is the all-zero record that marks an absent chunk.
    pub fn is_absent(&self) -> bool {
        *self == SectorSlice::default()
    }
}

impl WireEncode for SectorSlice {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u32(self.offset);
        enc.write_u32(self.length);
        enc.write_raw(&self.checksum);
        enc.write_raw(&self.merkle_root);
    }
}

impl WireDecode for SectorSlice {
    fn decode(dec: &mut Decoder<'_>) -> tessera_wire::Result<Self> {
        Ok(SectorSlice {
            offset: dec.read_u32()?,
            length: dec.read_u32()?,
            checksum: dec.read_array()?,
            merkle_root: dec.read_array()?,
        })
    }
}

/// An open shard index file.
pub struct Shard {
    file: File,
}

impl Shard {
    /// Open a shard file, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(RenterError::ShardIo)?;
        Ok(Self { file })
    }

    /// Write the slice record for `chunk_index`, overwriting any previous
    /// record at that index.
    pub fn write_slice(&mut self, slice: &SectorSlice, chunk_index: u64) -> Result<()> {
        let bytes = tessera_wire::to_bytes(slice);
        self.file
            .seek(SeekFrom::Start(chunk_index * SLICE_LEN as u64))
            .map_err(RenterError::ShardIo)?;
        self.file.write_all(&bytes).map_err(RenterError::ShardIo)?;
        Ok(())
    }

    /// Read the slice record for `chunk_index`.
    ///
    /// Returns the zero slice both for indices inside the file that were
    /// never written and for indices past the end of the file.
    pub fn read_slice(&mut self, chunk_index: u64) -> Result<SectorSlice> {
        let offset = chunk_index * SLICE_LEN as u64;
        let end = self.file.metadata().map_err(RenterError::ShardIo)?.len();
        if offset + SLICE_LEN as u64 > end {
            return Ok(SectorSlice::default());
        }
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(RenterError::ShardIo)?;
        let mut buf = [0u8; SLICE_LEN];
        self.file.read_exact(&mut buf).map_err(RenterError::ShardIo)?;
        tessera_wire::from_bytes(&buf).map_err(|e| {
            RenterError::ShardIo(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Number of slice records the file can hold, derived from its
    /// length. Used by recovery scans.
    pub fn slice_count(&self) -> Result<u64> {
        let len = self.file.metadata().map_err(RenterError::ShardIo)?.len();
        Ok(len / SLICE_LEN as u64)
    }

    /// Flush buffered writes to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data().map_err(RenterError::ShardIo)
    }
}
