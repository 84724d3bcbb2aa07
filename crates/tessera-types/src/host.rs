//! Host identities, signed settings, and announcements.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use tessera_crypto::ed25519::VerifyingKey;

use crate::currency::Currency;
use crate::{BlockHeight, Result, TypesError};

/// String prefix of an encoded host public key.
pub const HOST_KEY_PREFIX: &str = "ed25519:";

/// A host's 32-byte Ed25519 identity key.
///
/// The string form is `"ed25519:" || hex`. The raw bytes are kept as
/// received; point validation happens when the key is actually used for
/// verification.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPublicKey([u8; 32]);

impl HostPublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The Ed25519 verifying key, if the bytes form a valid curve point.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| TypesError::InvalidPublicKey)
    }

    /// Abbreviated key used in shard file names: the first 8 hex digits.
    pub fn short_key(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Whether this key's string form starts with `prefix`.
    ///
    /// The prefix may omit the `"ed25519:"` tag.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let full = self.to_string();
        let tagged;
        let prefix = if prefix.starts_with(HOST_KEY_PREFIX) {
            prefix
        } else {
            tagged = format!("{HOST_KEY_PREFIX}{prefix}");
            &tagged
        };
        full.starts_with(prefix)
    }
}

impl std::fmt::Display for HostPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{HOST_KEY_PREFIX}{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for HostPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HostPublicKey({self})")
    }
}

impl std::str::FromStr for HostPublicKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let hex_part = s
            .strip_prefix(HOST_KEY_PREFIX)
            .ok_or_else(|| TypesError::InvalidHostKey(format!("missing {HOST_KEY_PREFIX} tag")))?;
        let bytes = hex::decode(hex_part)
            .map_err(|e| TypesError::InvalidHostKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TypesError::InvalidHostKey("key is not 32 bytes".into()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for HostPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HostPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A host's signed settings record.
///
/// On the wire the settings travel as a signed object; the signature is
/// over the canonical encoding and is checked against the host's identity
/// key before any field is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    /// Whether the host is currently accepting new contracts.
    pub accepting_contracts: bool,
    /// The address the host claims to listen on. The dialed address wins
    /// when they disagree.
    pub net_address: String,
    /// Maximum contract duration in blocks.
    pub max_duration: BlockHeight,
    /// Proof window size in blocks.
    pub window_size: BlockHeight,
    /// Maximum collateral the host will commit to one contract.
    pub max_collateral: Currency,
    /// Collateral the host offers per byte per block of stored data.
    pub collateral_price: Currency,
    /// Flat fee for forming a contract.
    pub contract_price: Currency,
    /// Price per byte per block of stored data.
    pub storage_price: Currency,
    /// Price per byte uploaded.
    pub upload_bandwidth_price: Currency,
    /// Price per byte downloaded.
    pub download_bandwidth_price: Currency,
    /// Sector size the host serves. Must equal [`crate::SECTOR_SIZE`].
    pub sector_size: u64,
    /// Highest revision number the host will accept per contract.
    pub max_revision_number: u64,
}

/// A host's self-published address record, signed with its identity key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAnnouncement {
    pub net_address: String,
    pub public_key: HostPublicKey,
}
