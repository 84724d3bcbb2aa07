//! Metafile directory layout.
//!
//! A metafile directory holds one shard file per host, named
//! `<host-short-key>.shard`, plus whatever metadata the packaging layer
//! (out of scope here) adds. Writes happen in a sibling directory with a
//! `_workdir` suffix; a surviving workdir signals an unclean shutdown and
//! requests recovery.
//!
//! Per-host encryption keys are derived from the metafile's master key
//! and the host's identity, so no two hosts ever share a keystream.

use std::path::{Path, PathBuf};

use tracing::info;

use tessera_crypto::hashing;
use tessera_crypto::segment::SegmentKey;
use tessera_types::HostPublicKey;

use crate::shard::Shard;
use crate::{RenterError, Result};

/// Suffix marking an in-progress working directory.
pub const WORKDIR_SUFFIX: &str = "_workdir";

/// An open metafile directory.
pub struct MetaFile {
    dir: PathBuf,
    master_key: [u8; 32],
}

impl MetaFile {
    /// Open a metafile directory, creating it if absent and recovering a
    /// leftover workdir if one exists.
    pub fn open(dir: impl AsRef<Path>, master_key: [u8; 32]) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let workdir = workdir_path(&dir);

        if workdir.exists() && !dir.exists() {
            // Unclean shutdown after the final directory was removed but
            // before the workdir was renamed into place.
            std::fs::rename(&workdir, &dir).map_err(RenterError::MetaIo)?;
            info!(dir = %dir.display(), "recovered metafile workdir");
        }
        std::fs::create_dir_all(&dir).map_err(RenterError::MetaIo)?;

        Ok(Self { dir, master_key })
    }

    /// Whether a leftover workdir exists alongside the directory,
    /// requesting recovery by the packaging layer.
    pub fn needs_recovery(dir: impl AsRef<Path>) -> bool {
        workdir_path(dir.as_ref()).exists()
    }

    /// The directory this metafile lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the shard file for `host`.
    pub fn shard_path(&self, host: &HostPublicKey) -> PathBuf {
        self.dir.join(format!("{}.shard", host.short_key()))
    }

    /// Open (or create) the shard file for `host`.
    pub fn open_shard(&self, host: &HostPublicKey) -> Result<Shard> {
        Shard::open(self.shard_path(host))
    }

    /// The symmetric key used for data stored on `host`:
    /// `BLAKE3::derive_key("tessera v1 shard-encryption-key", master || host_key)`.
    pub fn encryption_key(&self, host: &HostPublicKey) -> SegmentKey {
        let material = hashing::encode_multi_field(&[&self.master_key, host.as_bytes()]);
        SegmentKey::from_bytes(hashing::derive_key(
            hashing::contexts::SHARD_ENCRYPTION_KEY,
            &material,
        ))
    }
}

fn workdir_path(dir: &Path) -> PathBuf {
    let mut name = dir.as_os_str().to_os_string();
    name.push(WORKDIR_SUFFIX);
    PathBuf::from(name)
}
