//! Construction of successor revisions.
//!
//! Every action moves coins the same way: the cost leaves the renter's
//! valid output for the host's, and leaves the renter's missed output for
//! the void. Uploads additionally move collateral from the host's missed
//! output into the void, grow the file by one sector, and commit to the
//! new Merkle root.
//!
//! Conservation holds across every step: the sum of the valid outputs and
//! the sum of the missed outputs are both unchanged.

use tessera_types::revision::{MISSED_HOST, MISSED_RENTER, MISSED_VOID, VALID_HOST, VALID_RENTER};
use tessera_types::{ContractRevision, Currency, Hash, SECTOR_SIZE};

use crate::{ProtoError, Result};

/// Copy `current`, transfer `cost` renter-to-host, and increment the
/// revision number.
fn new_revision(current: &ContractRevision, cost: Currency) -> Result<ContractRevision> {
    if current.valid_outputs.len() != 2 || current.missed_outputs.len() != 3 {
        return Err(ProtoError::Types(tessera_types::TypesError::MalformedOutputs));
    }
    let mut rev = current.clone();

    // Move the valid payout from renter to host.
    rev.valid_outputs[VALID_RENTER].value = rev.valid_outputs[VALID_RENTER]
        .value
        .checked_sub(cost)
        .ok_or(ProtoError::InsufficientFunds)?;
    rev.valid_outputs[VALID_HOST].value = rev.valid_outputs[VALID_HOST]
        .value
        .checked_add(cost)
        .ok_or(ProtoError::PriceOverflow)?;

    // Move the missed payout from renter to the void.
    rev.missed_outputs[MISSED_RENTER].value = rev.missed_outputs[MISSED_RENTER]
        .value
        .checked_sub(cost)
        .ok_or(ProtoError::InsufficientFunds)?;
    rev.missed_outputs[MISSED_VOID].value = rev.missed_outputs[MISSED_VOID]
        .value
        .checked_add(cost)
        .ok_or(ProtoError::PriceOverflow)?;

    rev.revision_number += 1;
    Ok(rev)
}

/// Revise `current` to cover the cost of downloading data.
pub fn new_download_revision(
    current: &ContractRevision,
    download_cost: Currency,
) -> Result<ContractRevision> {
    new_revision(current, download_cost)
}

/// Revise `current` to cover the cost of uploading one sector.
///
/// `merkle_root` is the file's new root with the uploaded sector
/// appended; `collateral` is the host's stake, moved from its missed
/// output into the void.
pub fn new_upload_revision(
    current: &ContractRevision,
    merkle_root: Hash,
    price: Currency,
    collateral: Currency,
) -> Result<ContractRevision> {
    let mut rev = new_revision(current, price)?;

    // Move collateral from host to the void.
    rev.missed_outputs[MISSED_HOST].value = rev.missed_outputs[MISSED_HOST]
        .value
        .checked_sub(collateral)
        .ok_or(ProtoError::InsufficientFunds)?;
    rev.missed_outputs[MISSED_VOID].value = rev.missed_outputs[MISSED_VOID]
        .value
        .checked_add(collateral)
        .ok_or(ProtoError::PriceOverflow)?;

    rev.file_size += SECTOR_SIZE as u64;
    rev.file_merkle_root = merkle_root;
    Ok(rev)
}
