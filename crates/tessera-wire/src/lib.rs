//! # tessera-wire
//!
//! Wire codec for the tessera renter-host protocol.
//!
//! Every object on the wire is serialized as little-endian fixed-width
//! integers with `u64` length prefixes on variable sequences. Objects are
//! framed as `[len:u64][body]`; signed objects append a raw 64-byte
//! Ed25519 signature over the body bytes. All reads carry an explicit
//! maximum size and fail before allocating when it is exceeded.
//!
//! ## Modules
//!
//! - [`codec`] — `WireEncode`/`WireDecode` traits and the byte-level encoder/decoder
//! - [`specifier`] — 16-byte ASCII protocol tags
//! - [`frame`] — Object framing, signed objects, and negotiation response tags

pub mod codec;
pub mod frame;
pub mod specifier;

pub use codec::{from_bytes, to_bytes, Decoder, Encoder, WireDecode, WireEncode};
pub use frame::Response;
pub use specifier::Specifier;

/// Error types for wire encoding and framing.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Underlying transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A framed object exceeded the caller's size limit.
    #[error("object of {len} bytes exceeds maximum {max}")]
    Oversize { len: u64, max: u64 },

    /// The buffer ended before the object did.
    #[error("unexpected end of encoded object")]
    UnexpectedEof,

    /// The object decoded cleanly but left bytes behind.
    #[error("trailing bytes after encoded object")]
    TrailingBytes,

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A length prefix exceeds the bytes actually present.
    #[error("length prefix {0} exceeds remaining input")]
    BadLength(u64),

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// The peer sent a response tag that is neither accept nor stop.
    #[error("unrecognized negotiation response {0:#04x}")]
    BadResponse(u8),

    /// A signed object's signature did not verify.
    #[error("signature verification failed")]
    SignatureInvalid,
}

pub type Result<T> = std::result::Result<T, WireError>;
