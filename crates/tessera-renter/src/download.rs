//! Shard-backed download, decrypt, and verify.
//!
//! The downloader reads a chunk's slice commitment from the shard,
//! fetches the padded ciphertext range from the host, decrypts it with
//! the chunk's segment range, truncates the padding, and verifies the
//! plaintext against the recorded checksum.

use tracing::debug;

use tessera_crypto::hashing;
use tessera_crypto::segment::SegmentKey;
use tessera_proto::Session;
use tessera_types::{SEGMENTS_PER_SECTOR, SEGMENT_SIZE};

use crate::shard::Shard;
use crate::{RenterError, Result};

/// Downloads chunks from one host, verifying them against its shard.
pub struct ShardDownloader {
    session: Session,
    shard: Shard,
    key: SegmentKey,
}

impl ShardDownloader {
    /// Wrap an open download session and shard file.
    pub fn new(session: Session, shard: Shard, key: SegmentKey) -> Self {
        Self {
            session,
            shard,
            key,
        }
    }

    /// Fetch, decrypt, and verify the data for `chunk_index`.
    ///
    /// Chunks were uploaded one per sector in chunk order, so the
    /// host-side sector index equals the chunk index.
    pub fn download_chunk(&mut self, chunk_index: u64) -> Result<Vec<u8>> {
        let slice = self.shard.read_slice(chunk_index)?;
        if slice.is_absent() {
            return Err(RenterError::ChunkNotUploaded(chunk_index));
        }

        let padded = (slice.length as usize).div_ceil(SEGMENT_SIZE) * SEGMENT_SIZE;
        let mut data = self
            .session
            .download(chunk_index, slice.offset, padded as u32)?;

        self.key
            .decrypt_segments(&mut data, chunk_index * SEGMENTS_PER_SECTOR as u64)?;
        data.truncate(slice.length as usize);

        if hashing::slice_checksum(&data) != slice.checksum {
            return Err(RenterError::ChecksumMismatch(chunk_index));
        }
        debug!(chunk = chunk_index, length = slice.length, "chunk downloaded");
        Ok(data)
    }

    /// Whether the host asked the session to stop after the last download.
    pub fn host_stopped(&self) -> bool {
        self.session.host_stopped()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the session.
    pub fn close(mut self) -> Result<()> {
        self.session.close()?;
        Ok(())
    }
}
