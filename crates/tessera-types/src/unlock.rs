//! Unlock conditions and addresses.
//!
//! A contract's coins are guarded by unlock conditions: a set of public
//! keys and a signature threshold. For renter-host contracts the standard
//! form is 2-of-2, renter key first. The unlock hash commits to the whole
//! structure; it must never change across revisions of one contract.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use tessera_crypto::ed25519::VerifyingKey;
use tessera_crypto::hashing;
use tessera_wire::{to_bytes, Specifier};

use crate::{BlockHeight, Hash};

/// Signature algorithm tag for Ed25519 keys.
pub const ALGORITHM_ED25519: Specifier = Specifier::new(b"ed25519");

/// A public key tagged with its signature algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub algorithm: Specifier,
    pub key: Vec<u8>,
}

impl KeySpec {
    /// An Ed25519 key spec.
    pub fn ed25519(key: &VerifyingKey) -> Self {
        Self {
            algorithm: ALGORITHM_ED25519,
            key: key.to_bytes().to_vec(),
        }
    }
}

/// Conditions that must be met to spend a contract's coins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockConditions {
    /// Earliest height at which signatures become valid.
    pub timelock: BlockHeight,
    pub public_keys: Vec<KeySpec>,
    pub signatures_required: u64,
}

impl UnlockConditions {
    /// The standard renter-host conditions: 2-of-2, renter key first.
    pub fn standard(renter: &VerifyingKey, host: &VerifyingKey) -> Self {
        Self {
            timelock: 0,
            public_keys: vec![KeySpec::ed25519(renter), KeySpec::ed25519(host)],
            signatures_required: 2,
        }
    }

    /// A single-key condition, used for wallet addresses.
    pub fn single(key: &VerifyingKey) -> Self {
        Self {
            timelock: 0,
            public_keys: vec![KeySpec::ed25519(key)],
            signatures_required: 1,
        }
    }

    /// The address committing to these conditions:
    /// a domain-separated BLAKE3 hash of the canonical encoding.
    pub fn unlock_hash(&self) -> Address {
        let key = hashing::derive_key(hashing::contexts::UNLOCK_HASH, b"");
        Address(hashing::keyed_hash(&key, &to_bytes(self)))
    }
}

/// A 32-byte address (unlock hash).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub Hash);

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl std::str::FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
