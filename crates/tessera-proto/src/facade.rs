//! Wallet and transaction pool capabilities.
//!
//! The protocol layer does not care where keys or coins live; callers
//! hand it implementations of these traits. Two concrete realizations
//! exist downstream: one backed by a full node daemon's API, one pairing
//! an external wallet server with an in-memory seed.

use tessera_types::{Address, Currency, Hash, Transaction, UnlockConditions, UnspentOutput};

/// Key custody and transaction signing.
pub trait Wallet {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generate (and start tracking) a fresh address.
    fn new_address(&self) -> std::result::Result<Address, Self::Error>;

    /// Add signatures to `txn`.
    ///
    /// In explicit mode, `to_sign` lists the parent IDs of the signature
    /// slots to fill; an unknown target is an error. In lazy mode
    /// (`to_sign` empty), a standard signature is appended for every
    /// input whose address the wallet owns, silently skipping the rest.
    fn sign_transaction(
        &self,
        txn: &mut Transaction,
        to_sign: &[Hash],
    ) -> std::result::Result<(), Self::Error>;

    /// The spendable outputs the wallet tracks.
    fn unspent_outputs(&self) -> std::result::Result<Vec<UnspentOutput>, Self::Error>;

    /// The unlock conditions behind one of the wallet's addresses.
    fn unlock_conditions(&self, addr: Address)
        -> std::result::Result<UnlockConditions, Self::Error>;

    /// Unconfirmed transactions that `txn` depends on. Implementations
    /// without mempool visibility return an empty list; callers must
    /// tolerate that.
    fn unconfirmed_parents(
        &self,
        txn: &Transaction,
    ) -> std::result::Result<Vec<Transaction>, Self::Error>;
}

/// Transaction broadcast and fee discovery.
pub trait TransactionPool {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Submit a transaction set for broadcast.
    fn accept_transaction_set(&self, txns: &[Transaction])
        -> std::result::Result<(), Self::Error>;

    /// Current fee estimate in coins per byte: `(minimum, maximum)`.
    fn fee_estimate(&self) -> std::result::Result<(Currency, Currency), Self::Error>;
}
