//! Integration tests for upload sessions against the mock host.
//!
//! Covers the committed upload iteration (balances, file size, on-disk
//! state), the price-increase abort, the stop-response pass-through, and
//! idempotent session close.

use tessera_crypto::ed25519::SigningKey;
use tessera_integration_tests::{form_contract, test_settings, HostBehavior, MockHost};
use tessera_proto::contract::peek_revision;
use tessera_proto::{ContractFile, HostProfile, ProtoError, Session};
use tessera_types::revision::{MISSED_HOST, MISSED_RENTER, MISSED_VOID, VALID_HOST, VALID_RENTER};
use tessera_types::{Currency, HostPublicKey, SECTOR_SIZE};

const SECTOR: u128 = SECTOR_SIZE as u128;
const WINDOW_START: u64 = 5000;
// One block of remaining duration keeps the expected prices legible.
const CURRENT_HEIGHT: u64 = WINDOW_START - 1;

const RENTER_FUNDS: u128 = 100 * SECTOR;
const HOST_FUNDS: u128 = 10 * SECTOR;

struct Fixture {
    host: MockHost,
    profile: HostProfile,
    contract_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn fixture(behavior: HostBehavior) -> (Fixture, ContractFile) {
    let renter_key = SigningKey::generate();
    let host_key = SigningKey::generate();
    let formation = form_contract(
        &renter_key,
        &host_key,
        RENTER_FUNDS,
        HOST_FUNDS,
        WINDOW_START,
        WINDOW_START + 144,
    );
    let initial_revision = formation.revisions[0].clone();
    let initial_signatures = formation.signatures.clone();

    let host = MockHost::spawn(
        host_key.clone(),
        test_settings("placeholder"),
        initial_revision,
        initial_signatures,
        behavior,
    );
    let profile = HostProfile {
        key: HostPublicKey::from_bytes(host_key.verifying_key().to_bytes()),
        settings: test_settings(host.addr()),
    };

    let dir = tempfile::tempdir().expect("tempdir");
    let contract_path = dir.path().join("host.contract");
    let contract =
        ContractFile::create(&contract_path, formation, renter_key).expect("create contract");

    (
        Fixture {
            host,
            profile,
            contract_path,
            _dir: dir,
        },
        contract,
    )
}

/// With the fixture's prices and one block of duration:
/// storage 2/byte/block + upload 1/byte over one sector.
const EXPECTED_PRICE: u128 = 2 * SECTOR + SECTOR;
/// Collateral 1/byte/block over one sector.
const EXPECTED_COLLATERAL: u128 = SECTOR;

#[test]
fn upload_iteration_commits_expected_revision() {
    let (fx, contract) = fixture(HostBehavior::default());
    let mut session =
        Session::dial_upload(&fx.profile, contract, CURRENT_HEIGHT).expect("dial");

    let sector = vec![0x5Au8; SECTOR_SIZE];
    let sector: Box<[u8; SECTOR_SIZE]> = sector.into_boxed_slice().try_into().expect("boxed");
    let root = session.upload(&sector).expect("upload");

    let rev = session.current_revision();
    assert_eq!(rev.revision_number, 1);
    assert_eq!(rev.file_size, SECTOR_SIZE as u64);
    assert_eq!(rev.file_merkle_root, root);

    assert_eq!(
        rev.valid_outputs[VALID_RENTER].value,
        Currency::new(RENTER_FUNDS - EXPECTED_PRICE)
    );
    assert_eq!(
        rev.valid_outputs[VALID_HOST].value,
        Currency::new(HOST_FUNDS + EXPECTED_PRICE)
    );
    assert_eq!(
        rev.missed_outputs[MISSED_RENTER].value,
        Currency::new(RENTER_FUNDS - EXPECTED_PRICE)
    );
    assert_eq!(
        rev.missed_outputs[MISSED_HOST].value,
        Currency::new(HOST_FUNDS - EXPECTED_COLLATERAL)
    );
    assert_eq!(
        rev.missed_outputs[MISSED_VOID].value,
        Currency::new(EXPECTED_PRICE + EXPECTED_COLLATERAL)
    );

    // Conservation across the step.
    assert_eq!(
        rev.total_valid().expect("sum"),
        Currency::new(RENTER_FUNDS + HOST_FUNDS)
    );
    assert_eq!(
        rev.total_missed().expect("sum"),
        Currency::new(RENTER_FUNDS + HOST_FUNDS)
    );

    // The committed revision reached disk, and the host agrees.
    assert_eq!(
        peek_revision(&fx.contract_path).expect("peek").revision_number,
        1
    );
    assert_eq!(fx.host.current_revision().revision_number, 1);
    assert!(fx.host.stored_sector(0).is_some());

    session.close().expect("close");
}

#[test]
fn revision_numbers_increase_across_iterations() {
    let (fx, contract) = fixture(HostBehavior::default());
    let mut session =
        Session::dial_upload(&fx.profile, contract, CURRENT_HEIGHT).expect("dial");

    let sector: Box<[u8; SECTOR_SIZE]> = vec![1u8; SECTOR_SIZE]
        .into_boxed_slice()
        .try_into()
        .expect("boxed");
    for expected in 1..=3u64 {
        session.upload(&sector).expect("upload");
        assert_eq!(session.current_revision().revision_number, expected);
    }
    assert_eq!(
        session.current_revision().file_size,
        3 * SECTOR_SIZE as u64
    );
    assert_eq!(fx.host.current_revision().revision_number, 3);

    session.close().expect("close");
}

#[test]
fn price_increase_aborts_without_commit() {
    let (fx, contract) = fixture(HostBehavior {
        raise_storage_price_after: Some(1),
        ..HostBehavior::default()
    });
    let mut session =
        Session::dial_upload(&fx.profile, contract, CURRENT_HEIGHT).expect("dial");

    let sector: Box<[u8; SECTOR_SIZE]> = vec![2u8; SECTOR_SIZE]
        .into_boxed_slice()
        .try_into()
        .expect("boxed");
    session.upload(&sector).expect("first upload");

    let err = session.upload(&sector).expect_err("price gate");
    assert!(matches!(err, ProtoError::PriceIncreased(_)));

    // Nothing moved: the contract is still at the first committed
    // revision, in memory and on disk.
    assert_eq!(session.current_revision().revision_number, 1);
    assert_eq!(
        peek_revision(&fx.contract_path).expect("peek").revision_number,
        1
    );

    session.close().expect("close");
}

#[test]
fn stop_response_commits_then_blocks_further_iterations() {
    let (fx, contract) = fixture(HostBehavior {
        stop_after_signature: true,
        ..HostBehavior::default()
    });
    let mut session =
        Session::dial_upload(&fx.profile, contract, CURRENT_HEIGHT).expect("dial");

    let sector: Box<[u8; SECTOR_SIZE]> = vec![3u8; SECTOR_SIZE]
        .into_boxed_slice()
        .try_into()
        .expect("boxed");
    session.upload(&sector).expect("upload completes");

    // The iteration committed even though the host asked us to stop.
    assert!(session.host_stopped());
    assert_eq!(session.current_revision().revision_number, 1);
    assert_eq!(
        peek_revision(&fx.contract_path).expect("peek").revision_number,
        1
    );

    // Further iterations are refused locally.
    let err = session.upload(&sector).expect_err("stopped session");
    assert!(matches!(err, ProtoError::StopResponse));

    session.close().expect("close");
}

#[test]
fn closing_twice_is_a_single_clean_close() {
    let (fx, contract) = fixture(HostBehavior::default());
    let mut session =
        Session::dial_upload(&fx.profile, contract, CURRENT_HEIGHT).expect("dial");

    session.close().expect("first close");
    session.close().expect("second close is a no-op");
    drop(fx);
}
