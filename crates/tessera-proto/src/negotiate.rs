//! Single-iteration exchanges of the revision protocol.
//!
//! Three building blocks, run in order by the session for every upload or
//! download:
//!
//! 1. [`start_revision`] — settings re-exchange with the price-increase gate
//! 2. the action stream (written by the session)
//! 3. [`negotiate_revision`] — revision and signature exchange, ending in
//!    whole-transaction validation
//!
//! The opening handshake's revision synchronization lives in
//! [`verify_recent_revision`].

use std::io::{Read, Write};

use tracing::debug;

use tessera_crypto::ed25519::{secure_wipe, SigningKey};
use tessera_types::{
    ContractRevision, CoveredFields, HostPublicKey, HostSettings, Transaction,
    TransactionSignature, SECTOR_SIZE,
};
use tessera_wire::frame::{
    read_array, read_object, read_response, read_signed_object, write_object, write_prefixed,
    write_response,
};
use tessera_wire::Response;

use crate::contract::ContractFile;
use crate::{
    wire_error, ProtoError, Result, CHALLENGE_LEN, MAX_REVISION_LEN, MAX_SETTINGS_LEN,
    MAX_SIGNATURES_LEN, MAX_SIGNATURE_LEN, SPEC_SETTINGS,
};

/// Read a signed settings record, verify it against the host's identity
/// key, and sanity-check the fields this protocol depends on.
///
/// The received net address is overwritten with the dialed address when
/// they disagree; the dialed address is the one that demonstrably works.
pub fn verify_settings(
    conn: &mut (impl Read + Write),
    host_key: &HostPublicKey,
    dialed_addr: &str,
) -> Result<HostSettings> {
    let spec = tessera_wire::frame::read_specifier(conn).map_err(wire_error)?;
    if spec != SPEC_SETTINGS {
        return Err(ProtoError::UnexpectedSpecifier(spec));
    }
    let verifying = host_key.verifying_key()?;
    let mut settings: HostSettings =
        read_signed_object(conn, MAX_SETTINGS_LEN, &verifying).map_err(wire_error)?;

    if settings.sector_size != SECTOR_SIZE as u64 {
        return Err(ProtoError::BadSettings(format!(
            "host serves {}-byte sectors",
            settings.sector_size
        )));
    }
    if settings.net_address != dialed_addr {
        settings.net_address = dialed_addr.to_string();
    }
    Ok(settings)
}

/// Begin one revision iteration: re-read the host's settings, refuse any
/// price increase, and acknowledge.
///
/// On success the session's cached settings are replaced with the fresh
/// record. On a price increase a negotiation stop is written and nothing
/// is cached.
pub fn start_revision(
    conn: &mut (impl Read + Write),
    cached: &mut HostSettings,
    host_key: &HostPublicKey,
) -> Result<()> {
    let fresh = verify_settings(conn, host_key, &cached.net_address)?;

    let increased = if fresh.storage_price > cached.storage_price {
        Some("storage")
    } else if fresh.upload_bandwidth_price > cached.upload_bandwidth_price {
        Some("upload bandwidth")
    } else if fresh.download_bandwidth_price > cached.download_bandwidth_price {
        Some("download bandwidth")
    } else {
        None
    };
    if let Some(which) = increased {
        write_response(conn, Response::Stop).map_err(wire_error)?;
        return Err(ProtoError::PriceIncreased(which));
    }

    *cached = fresh;
    write_response(conn, Response::Accept).map_err(wire_error)?;
    Ok(())
}

/// Send a revision to the host for approval, exchanging transaction
/// signatures and validating the result. One iteration of the revision
/// loop.
///
/// Returns the fully signed transaction and whether the host asked the
/// session to stop after this iteration. A stop request still produces a
/// complete, valid transaction; the caller commits it and then closes.
pub fn negotiate_revision(
    conn: &mut (impl Read + Write),
    revision: &ContractRevision,
    renter_key: &SigningKey,
) -> Result<(Transaction, bool)> {
    // The renter key is always first in the unlock conditions.
    let mut txn = Transaction {
        revisions: vec![revision.clone()],
        signatures: vec![TransactionSignature {
            parent_id: revision.parent_id.0,
            public_key_index: 0,
            timelock: 0,
            covered_fields: CoveredFields::revision(0),
            signature: Vec::new(),
        }],
        ..Transaction::default()
    };
    txn.sign(0, renter_key)?;

    write_object(conn, revision).map_err(wire_error)?;
    match read_response(conn).map_err(wire_error)? {
        Response::Accept => {}
        Response::Stop => return Err(ProtoError::NegotiationStopped),
    }

    write_object(conn, &txn.signatures[0]).map_err(wire_error)?;

    // A stop here is informational: the host finishes the iteration but
    // wants no more.
    let host_stopped = match read_response(conn).map_err(wire_error)? {
        Response::Accept => false,
        Response::Stop => true,
    };
    let host_sig: TransactionSignature =
        read_object(conn, MAX_SIGNATURE_LEN).map_err(wire_error)?;
    txn.signatures.push(host_sig);

    let verification_height = revision.window_start.saturating_sub(1);
    txn.standalone_valid(verification_height)
        .map_err(ProtoError::InvalidNegotiatedTransaction)?;

    debug!(
        revision = revision.revision_number,
        host_stopped, "revision negotiated"
    );
    Ok((txn, host_stopped))
}

/// The opening handshake after the RPC specifier: prove our identity to
/// the host, then synchronize on its view of the contract.
///
/// Returns the host's revision and signatures after they verify at the
/// contract's end height and match the contract's unlock conditions.
pub fn verify_recent_revision(
    conn: &mut (impl Read + Write),
    contract: &ContractFile,
) -> Result<(ContractRevision, Vec<TransactionSignature>)> {
    write_object(conn, &contract.id()).map_err(wire_error)?;

    let mut challenge: [u8; CHALLENGE_LEN] = read_array(conn).map_err(wire_error)?;
    // The low half of the challenge must not survive in memory; the
    // signature covers the wiped value.
    secure_wipe(&mut challenge[..CHALLENGE_LEN / 2]);
    let sig = contract.renter_key().sign(&challenge);
    write_prefixed(conn, &sig.to_bytes()).map_err(wire_error)?;

    match read_response(conn).map_err(wire_error)? {
        Response::Accept => {}
        Response::Stop => return Err(ProtoError::NegotiationStopped),
    }

    let host_revision: ContractRevision =
        read_object(conn, MAX_REVISION_LEN).map_err(wire_error)?;
    let host_signatures: Vec<TransactionSignature> =
        read_object(conn, MAX_SIGNATURES_LEN).map_err(wire_error)?;

    let txn = Transaction {
        revisions: vec![host_revision.clone()],
        signatures: host_signatures.clone(),
        ..Transaction::default()
    };
    txn.standalone_valid(contract.end_height().saturating_sub(1))
        .map_err(ProtoError::InvalidNegotiatedTransaction)?;

    if host_revision.unlock_conditions.unlock_hash()
        != contract.current_revision().unlock_conditions.unlock_hash()
    {
        return Err(ProtoError::UnlockHashMismatch);
    }

    Ok((host_revision, host_signatures))
}

/// Best-effort settings read used during teardown. Errors are ignored by
/// the caller; the host may already be gone.
pub fn reread_settings(
    conn: &mut (impl Read + Write),
    host_key: &HostPublicKey,
    dialed_addr: &str,
) -> Result<HostSettings> {
    verify_settings(conn, host_key, dialed_addr)
}

/// The challenge value a challenge response actually signs: the issued
/// challenge with its low half wiped. Hosts verify against this form.
pub fn expected_challenge(challenge: [u8; CHALLENGE_LEN]) -> [u8; CHALLENGE_LEN] {
    let mut wiped = challenge;
    secure_wipe(&mut wiped[..CHALLENGE_LEN / 2]);
    wiped
}
