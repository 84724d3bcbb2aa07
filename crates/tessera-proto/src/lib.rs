//! # tessera-proto
//!
//! The renter-host revision protocol: a synchronous request/response state
//! machine over TCP that re-validates host settings, synchronizes the
//! authoritative contract revision, negotiates coin transfers for each
//! upload or download, and exchanges transaction signatures proving both
//! parties agreed.
//!
//! The protocol is strictly sequential per contract: one in-flight
//! iteration per connection, no pipelining. Concurrency across contracts
//! is the caller's concern.
//!
//! ## Modules
//!
//! - [`contract`] — On-disk contract store with advisory locking and atomic commits
//! - [`revise`] — Construction of successor revisions for uploads and downloads
//! - [`actions`] — The action set announcing an operation to the host
//! - [`negotiate`] — Single-iteration settings and revision exchanges
//! - [`session`] — Connection lifecycle: dial, handshake, iterate, teardown
//! - [`facade`] — Wallet and transaction pool capabilities consumed by callers

pub mod actions;
pub mod contract;
pub mod facade;
pub mod negotiate;
pub mod revise;
pub mod session;

use std::time::Duration;

use tessera_wire::{Specifier, WireError};

pub use contract::ContractFile;
pub use facade::{TransactionPool, Wallet};
pub use session::{HostProfile, Session};

/// RPC tag opening an upload session.
pub const RPC_UPLOAD: Specifier = Specifier::new(b"Upload");

/// RPC tag opening a download session.
pub const RPC_DOWNLOAD: Specifier = Specifier::new(b"Download");

/// Tag preceding each signed settings record.
pub const SPEC_SETTINGS: Specifier = Specifier::new(b"Settings");

/// Action tag: store a full sector.
pub const ACTION_UPLOAD: Specifier = Specifier::new(b"UploadSector");

/// Action tag: return part of a stored sector.
pub const ACTION_DOWNLOAD: Specifier = Specifier::new(b"DownloadSector");

/// Maximum encoded size of a signed settings record.
pub const MAX_SETTINGS_LEN: u64 = 16 * 1024;

/// Maximum encoded size of a revision.
pub const MAX_REVISION_LEN: u64 = 2 * 1024;

/// Maximum encoded size of a signature list.
pub const MAX_SIGNATURES_LEN: u64 = 2 * 1024;

/// Maximum encoded size of a single transaction signature.
pub const MAX_SIGNATURE_LEN: u64 = 1024;

/// Length of the handshake challenge.
pub const CHALLENGE_LEN: usize = 32;

/// Timeout for establishing the TCP connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for the opening revision handshake.
pub const RECENT_REVISION_TIMEOUT: Duration = Duration::from_secs(120);

/// Deadline for a settings exchange.
pub const SETTINGS_TIMEOUT: Duration = Duration::from_secs(120);

/// Idle budget for a long-lived session between iterations.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Error types for the revision protocol.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The host could not be reached within the dial timeout.
    #[error("could not dial host: {0}")]
    DialFailed(std::io::Error),

    /// A read or write missed its phase deadline.
    #[error("connection timed out")]
    Timeout,

    /// The host closed the connection.
    #[error("host disconnected")]
    HostDisconnected,

    /// Wire-level failure: framing, oversize objects, bad tags.
    #[error("wire error: {0}")]
    Wire(WireError),

    /// The host's settings signature did not verify.
    #[error("host settings signature invalid")]
    SignatureInvalid,

    /// The host's settings are unusable for this protocol.
    #[error("unusable host settings: {0}")]
    BadSettings(String),

    /// A message opened with an unexpected specifier.
    #[error("unexpected specifier '{0}'")]
    UnexpectedSpecifier(Specifier),

    /// The host raised a price mid-session.
    #[error("host {0} price increased")]
    PriceIncreased(&'static str),

    /// The host refused to continue before the iteration completed.
    /// Nothing was persisted.
    #[error("host stopped negotiation")]
    NegotiationStopped,

    /// The host told us to send no more iterations. The current iteration
    /// committed; the session must close.
    #[error("host requested session stop")]
    StopResponse,

    /// The fully signed transaction failed validation. Nothing was
    /// persisted.
    #[error("negotiated transaction is invalid: {0}")]
    InvalidNegotiatedTransaction(tessera_types::TypesError),

    /// The host's revision is not ours and not a valid successor.
    #[error("contract out of sync with host")]
    ContractDesync,

    /// The host's revision carries foreign unlock conditions.
    #[error("unlock conditions do not match")]
    UnlockHashMismatch,

    /// The contract does not hold enough coins for this action.
    #[error("insufficient contract funds")]
    InsufficientFunds,

    /// A price computation overflowed.
    #[error("price computation overflowed")]
    PriceOverflow,

    /// The contract file is malformed or locked by another process.
    #[error("contract store: {0}")]
    ContractStore(String),

    /// Failure while persisting a committed revision.
    #[error("could not persist contract: {0}")]
    ContractPersist(std::io::Error),

    /// The session was already closed.
    #[error("session is closed")]
    SessionClosed,

    /// The contract's proof window has opened; no further revisions are
    /// possible.
    #[error("contract has ended")]
    ContractEnded,

    /// A download range does not fit inside a sector.
    #[error("invalid download range: offset {offset}, length {length}")]
    InvalidRange { offset: u32, length: u32 },

    /// The host returned the wrong amount of data.
    #[error("host returned {got} bytes, wanted {want}")]
    BadDownloadLength { want: u64, got: u64 },

    /// Domain validation failure outside negotiation.
    #[error(transparent)]
    Types(#[from] tessera_types::TypesError),

    /// Cryptographic primitive failure.
    #[error(transparent)]
    Crypto(#[from] tessera_crypto::CryptoError),

    /// Transport failure not otherwise classified.
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtoError>;

/// Classify an I/O error into the protocol taxonomy.
///
/// Host-initiated FIN detection prefers typed error kinds; the substring
/// match is a documented last-resort fallback for transports that only
/// surface a formatted message.
pub(crate) fn transport_error(err: std::io::Error) -> ProtoError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => ProtoError::Timeout,
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => ProtoError::HostDisconnected,
        _ if err.to_string().contains("use of closed network connection") => {
            ProtoError::HostDisconnected
        }
        _ => ProtoError::Io(err),
    }
}

/// Classify a wire error, unwrapping transport failures.
pub(crate) fn wire_error(err: WireError) -> ProtoError {
    match err {
        WireError::Io(io) => transport_error(io),
        WireError::SignatureInvalid => ProtoError::SignatureInvalid,
        other => ProtoError::Wire(other),
    }
}
