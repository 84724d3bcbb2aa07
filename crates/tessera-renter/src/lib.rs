//! # tessera-renter
//!
//! The sector staging pipeline: accumulate plaintext into fixed-size
//! sectors, pad and encrypt them, commit to their Merkle roots, and track
//! per-chunk slice commitments in on-disk shard files.
//!
//! ## Modules
//!
//! - [`sector`] — The sector builder: append, pad, encrypt, finalize
//! - [`shard`] — The shard index file mapping chunk index to sector slice
//! - [`metafile`] — Metafile directory layout and per-host keys
//! - [`hosts`] — Host directory capabilities consumed by orchestration
//! - [`upload`] — Shard-backed sector upload
//! - [`download`] — Shard-backed download, decrypt, and verify

pub mod download;
pub mod hosts;
pub mod metafile;
pub mod sector;
pub mod shard;
pub mod upload;

pub use download::ShardDownloader;
pub use sector::SectorBuilder;
pub use shard::{SectorSlice, Shard, SLICE_LEN};
pub use upload::ShardUploader;

/// Error types for the staging pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenterError {
    /// Appending would not fit in the sector's remaining capacity.
    #[error("data of {len} bytes (padded to {padded}) exceeds remaining sector capacity {remaining}")]
    Overflow {
        len: usize,
        padded: usize,
        remaining: usize,
    },

    /// I/O failure on a shard index file.
    #[error("shard I/O error: {0}")]
    ShardIo(std::io::Error),

    /// I/O failure on a metafile directory.
    #[error("metafile I/O error: {0}")]
    MetaIo(std::io::Error),

    /// A chunk has no slice recorded in the shard.
    #[error("chunk {0} has not been uploaded to this host")]
    ChunkNotUploaded(u64),

    /// Downloaded data did not hash to the recorded checksum.
    #[error("chunk {0} failed checksum verification")]
    ChecksumMismatch(u64),

    /// Protocol failure underneath the pipeline.
    #[error(transparent)]
    Proto(#[from] tessera_proto::ProtoError),

    /// Cryptographic primitive failure.
    #[error(transparent)]
    Crypto(#[from] tessera_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, RenterError>;
