//! Host directory capabilities.
//!
//! Orchestration resolves which hosts exist and where they listen through
//! this trait; two independent realizations live in the client crate (a
//! full node's API and a lightweight announcement server).

use tessera_types::HostPublicKey;

/// Maps key prefixes to hosts and hosts to network addresses.
pub trait HostKeyResolver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Find the unique host whose public key starts with `prefix`.
    ///
    /// Fails when no host matches, and fails differently when more than
    /// one does; a truncated key must never silently pick a host.
    fn lookup_host(&self, prefix: &str) -> std::result::Result<HostPublicKey, Self::Error>;

    /// The most recently announced network address of `host`.
    fn resolve_host_key(&self, host: &HostPublicKey) -> std::result::Result<String, Self::Error>;
}
