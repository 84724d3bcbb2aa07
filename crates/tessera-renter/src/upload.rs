//! Shard-backed sector upload.
//!
//! A `ShardUploader` ties a revision session to one shard file: each
//! chunk is staged in the sector builder, encrypted and padded, uploaded
//! as a full sector, and recorded in the shard as a slice commitment.
//!
//! One chunk occupies one sector here, uploaded in chunk order, so the
//! host-side sector index of a chunk equals its chunk index. The
//! downloader relies on the same correspondence.

use tracing::debug;

use tessera_crypto::segment::SegmentKey;
use tessera_proto::Session;

use crate::sector::SectorBuilder;
use crate::shard::{SectorSlice, Shard};
use crate::Result;

/// Uploads chunks to one host, recording slice commitments in its shard.
pub struct ShardUploader {
    session: Session,
    shard: Shard,
    key: SegmentKey,
    builder: SectorBuilder,
}

impl ShardUploader {
    /// Wrap an open upload session and shard file.
    pub fn new(session: Session, shard: Shard, key: SegmentKey) -> Self {
        Self {
            session,
            shard,
            key,
            builder: SectorBuilder::new(),
        }
    }

    /// Encrypt and upload the data for `chunk_index`, then record the
    /// resulting slice in the shard.
    ///
    /// The data is padded to a full sector before upload; the returned
    /// slice reflects the original plaintext.
    pub fn encrypt_and_upload(&mut self, data: &[u8], chunk_index: u64) -> Result<SectorSlice> {
        self.builder.reset();
        self.builder.append(data, &self.key, chunk_index)?;
        let sector = self.builder.finish();
        self.session.upload(sector)?;

        let slice = self.builder.slices()[0];
        self.shard.write_slice(&slice, chunk_index)?;
        debug!(chunk = chunk_index, length = slice.length, "chunk uploaded");
        Ok(slice)
    }

    /// Whether the host asked the session to stop after the last upload.
    pub fn host_stopped(&self) -> bool {
        self.session.host_stopped()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the session and flush the shard.
    pub fn close(mut self) -> Result<()> {
        self.shard.sync()?;
        self.session.close()?;
        Ok(())
    }
}
