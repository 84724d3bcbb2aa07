//! Shared fixtures for the integration tests: contract formation and an
//! in-process mock host that speaks the full revision protocol over a
//! real TCP socket.

pub mod mock_host;

use tessera_crypto::ed25519::SigningKey;
use tessera_types::{
    Address, ContractId, ContractRevision, CoveredFields, Currency, HostSettings, Output,
    Transaction, TransactionSignature, UnlockConditions, SECTOR_SIZE,
};

pub use mock_host::{HostBehavior, MockHost};

/// Settings fixture for a host listening at `net_address`.
pub fn test_settings(net_address: &str) -> HostSettings {
    HostSettings {
        accepting_contracts: true,
        net_address: net_address.to_string(),
        max_duration: 144 * 90,
        window_size: 144,
        max_collateral: Currency::new(u128::MAX / 4),
        collateral_price: Currency::new(1),
        contract_price: Currency::new(50),
        storage_price: Currency::new(2),
        upload_bandwidth_price: Currency::new(1),
        download_bandwidth_price: Currency::new(1),
        sector_size: SECTOR_SIZE as u64,
        max_revision_number: u64::MAX,
    }
}

/// Build a fully signed formation transaction: `renter_funds` on the
/// renter's outputs, `host_funds` on the host's, nothing in the void.
pub fn form_contract(
    renter: &SigningKey,
    host: &SigningKey,
    renter_funds: u128,
    host_funds: u128,
    window_start: u64,
    window_end: u64,
) -> Transaction {
    let parent_id = ContractId(tessera_crypto::hashing::hash(b"test contract"));
    let output = |value: u128| Output {
        value: Currency::new(value),
        address: Address([0u8; 32]),
    };
    let revision = ContractRevision {
        parent_id,
        unlock_conditions: UnlockConditions::standard(
            &renter.verifying_key(),
            &host.verifying_key(),
        ),
        revision_number: 0,
        file_size: 0,
        file_merkle_root: [0u8; 32],
        valid_outputs: vec![output(renter_funds), output(host_funds)],
        missed_outputs: vec![output(renter_funds), output(host_funds), output(0)],
        window_start,
        window_end,
    };
    sign_revision_transaction(revision, renter, host)
}

/// Wrap `revision` in a transaction signed by both contract keys.
pub fn sign_revision_transaction(
    revision: ContractRevision,
    renter: &SigningKey,
    host: &SigningKey,
) -> Transaction {
    let parent_id = revision.parent_id.0;
    let mut txn = Transaction {
        revisions: vec![revision],
        signatures: vec![
            TransactionSignature {
                parent_id,
                public_key_index: 0,
                timelock: 0,
                covered_fields: CoveredFields::revision(0),
                signature: Vec::new(),
            },
            TransactionSignature {
                parent_id,
                public_key_index: 1,
                timelock: 0,
                covered_fields: CoveredFields::revision(0),
                signature: Vec::new(),
            },
        ],
        ..Transaction::default()
    };
    txn.sign(0, renter).expect("sign renter");
    txn.sign(1, host).expect("sign host");
    txn
}
