//! # tessera-types
//!
//! Shared domain types for the tessera renter: currency, host identities
//! and settings, unlock conditions, contract revisions, and transactions.
//!
//! Types carry their canonical wire encoding (implemented in [`codec`])
//! because signatures, unlock hashes, and identifiers are all defined over
//! that encoding.

pub mod codec;
pub mod currency;
pub mod host;
pub mod revision;
pub mod transaction;
pub mod unlock;

pub use currency::Currency;
pub use host::{HostAnnouncement, HostPublicKey, HostSettings};
pub use revision::{ContractId, ContractRevision, Output, OutputId};
pub use transaction::{CoveredFields, Input, Transaction, TransactionSignature, UnspentOutput};
pub use unlock::{Address, KeySpec, UnlockConditions};

pub use tessera_crypto::SEGMENT_SIZE;

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// A chain height, measured in blocks.
pub type BlockHeight = u64;

/// Size of a sector, the atomic unit of host storage.
pub const SECTOR_SIZE: usize = 1 << 22;

/// Number of 64-byte cipher segments in one sector.
pub const SEGMENTS_PER_SECTOR: usize = SECTOR_SIZE / SEGMENT_SIZE;

/// Error types for domain validation.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// A host public key string was malformed.
    #[error("invalid host public key: {0}")]
    InvalidHostKey(String),

    /// A transaction signature references no revision or input in the
    /// transaction.
    #[error("signature references unknown parent")]
    MissingSignatureTarget,

    /// A covered-fields index is out of range for the transaction.
    #[error("covered field index {0} out of range")]
    CoveredFieldOutOfRange(u64),

    /// A signature's public key index exceeds the unlock conditions.
    #[error("public key index {0} out of range")]
    PublicKeyIndexOutOfRange(u64),

    /// An unlock condition names a signature algorithm we do not speak.
    #[error("unknown signature algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// A public key field did not contain a valid Ed25519 key.
    #[error("invalid public key in unlock conditions")]
    InvalidPublicKey,

    /// A timelock has not yet expired at the validation height.
    #[error("timelock {timelock} not reached at height {height}")]
    PrematureSignature { timelock: u64, height: u64 },

    /// A transaction signature failed Ed25519 verification.
    #[error("transaction signature invalid")]
    SignatureInvalid,

    /// A parent requiring `required` signatures received only `got`.
    #[error("{got} of {required} required signatures present")]
    MissingSignatures { required: u64, got: u64 },

    /// The valid and missed payout totals of a revision differ.
    #[error("revision payouts are not conserved")]
    CoinImbalance,

    /// A revision's file size is not a multiple of the sector size.
    #[error("file size {0} is not sector-aligned")]
    MisalignedFileSize(u64),

    /// A revision does not carry the expected output counts.
    #[error("revision has malformed proof outputs")]
    MalformedOutputs,

    /// A currency operation underflowed.
    #[error("insufficient funds")]
    InsufficientFunds,
}

pub type Result<T> = std::result::Result<T, TypesError>;
