//! # tessera-client
//!
//! Concrete realizations of the wallet, transaction pool, chain, and host
//! directory capabilities the renter consumes.
//!
//! Two deployments coexist:
//!
//! - [`NodeClient`] — a remote full-node daemon serves every role over
//!   its HTTP API, including transaction signing.
//! - The split pair — [`WalletClient`] talks a simpler REST protocol to
//!   an external wallet server and signs locally from an in-memory seed;
//!   [`AnnounceClient`] resolves hosts through a lightweight
//!   announcement server.
//!
//! They are independent implementations of the same capability set, not a
//! hierarchy.

pub mod announce;
pub mod node;
pub mod split;

pub use announce::AnnounceClient;
pub use node::NodeClient;
pub use split::WalletClient;

use tessera_types::BlockHeight;

/// Error types for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport or deserialization failure in the HTTP layer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A response did not parse as the documented shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// More than one host matches the given key prefix.
    #[error("ambiguous host key prefix")]
    Ambiguous,

    /// No host matches the given key prefix, or the wallet does not know
    /// the address.
    #[error("not found")]
    NotFound,

    /// The host never announced a network address.
    #[error("host announcement not found")]
    NoHostAnnouncement,

    /// An explicit signing target does not appear in the transaction or
    /// is not ours to sign.
    #[error("unknown signature target")]
    UnknownSigTarget,

    /// An announcement's signature did not verify.
    #[error("announcement signature invalid")]
    SignatureInvalid,

    /// A broadcast was requested for an empty transaction set.
    #[error("empty transaction set")]
    EmptyTransactionSet,

    /// Binary payload in a response failed to decode.
    #[error(transparent)]
    Wire(#[from] tessera_wire::WireError),

    /// Domain validation failure.
    #[error(transparent)]
    Types(#[from] tessera_types::TypesError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Chain observation: the two facts orchestration needs before spending.
pub trait ChainClient {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The current block height.
    fn chain_height(&self) -> std::result::Result<BlockHeight, Self::Error>;

    /// Whether the backing service believes it is synchronized with the
    /// network.
    fn synced(&self) -> std::result::Result<bool, Self::Error>;
}
