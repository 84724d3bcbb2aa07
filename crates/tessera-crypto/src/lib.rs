//! # tessera-crypto
//!
//! Cryptographic primitives for the tessera renter.
//!
//! Every operation the renter performs against a host is anchored in one of
//! these primitives. The suite is fixed; no algorithm negotiation is
//! permitted on the wire.
//!
//! ## Modules
//!
//! - [`hashing`] — Domain-separated BLAKE3 hashing (all registered context strings)
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)
//! - [`merkle`] — Sector Merkle roots over 64-byte segments
//! - [`segment`] — Segment-indexed stream cipher for sector contents
//! - [`seed`] — Wallet seed and index-derived signing keys

pub mod ed25519;
pub mod hashing;
pub mod merkle;
pub mod seed;
pub mod segment;

/// Cipher block size in bytes. Sector contents are encrypted and
/// Merkle-hashed in units of this size.
pub const SEGMENT_SIZE: usize = 64;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Input length does not satisfy the operation's requirements.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A segment index computation left the cipher's addressable range.
    #[error("segment index out of range: {0}")]
    SegmentIndexOutOfRange(u64),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
