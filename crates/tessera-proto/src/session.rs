//! Host session lifecycle.
//!
//! A session is one TCP connection speaking one RPC (upload or download)
//! against one contract. Opening a session runs the identity handshake
//! and synchronizes the local contract with the host's view; each
//! iteration then negotiates one revision; teardown re-reads settings
//! best-effort and writes a negotiation stop.
//!
//! Deadlines are set around each logical phase. A missed deadline
//! surfaces as [`ProtoError::Timeout`] and the session must be closed.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use tessera_crypto::merkle;
use tessera_types::revision::MISSED_HOST;
use tessera_types::{
    BlockHeight, ContractRevision, Currency, Hash, HostPublicKey, HostSettings, SECTOR_SIZE,
};
use tessera_wire::frame::{read_prefixed, write_object, write_response, write_specifier};
use tessera_wire::{Response, Specifier};

use crate::actions::{write_upload_action, ActionSet, RevisionAction};
use crate::contract::ContractFile;
use crate::negotiate::{negotiate_revision, reread_settings, start_revision, verify_recent_revision};
use crate::revise::{new_download_revision, new_upload_revision};
use crate::{
    transport_error, wire_error, ProtoError, Result, DIAL_TIMEOUT, RECENT_REVISION_TIMEOUT,
    RPC_DOWNLOAD, RPC_UPLOAD, SESSION_IDLE_TIMEOUT, SETTINGS_TIMEOUT,
};

/// A host as known from a prior scan: identity key plus the settings the
/// session starts from. The settings seed the price-increase gate.
#[derive(Clone, Debug)]
pub struct HostProfile {
    pub key: HostPublicKey,
    pub settings: HostSettings,
}

/// An open revision session with one host over one contract.
#[derive(Debug)]
pub struct Session {
    conn: TcpStream,
    addr: String,
    host_key: HostPublicKey,
    settings: HostSettings,
    contract: ContractFile,
    current_height: BlockHeight,
    host_stopped: bool,
    closed: bool,
}

impl Session {
    /// Open an upload session.
    pub fn dial_upload(
        host: &HostProfile,
        contract: ContractFile,
        current_height: BlockHeight,
    ) -> Result<Self> {
        Self::dial(host, contract, current_height, RPC_UPLOAD)
    }

    /// Open a download session.
    pub fn dial_download(
        host: &HostProfile,
        contract: ContractFile,
        current_height: BlockHeight,
    ) -> Result<Self> {
        Self::dial(host, contract, current_height, RPC_DOWNLOAD)
    }

    fn dial(
        host: &HostProfile,
        mut contract: ContractFile,
        current_height: BlockHeight,
        rpc: Specifier,
    ) -> Result<Self> {
        let addr = host.settings.net_address.clone();
        let sock_addr = addr
            .to_socket_addrs()
            .map_err(ProtoError::DialFailed)?
            .next()
            .ok_or_else(|| {
                ProtoError::DialFailed(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "address resolved to nothing",
                ))
            })?;
        let mut conn =
            TcpStream::connect_timeout(&sock_addr, DIAL_TIMEOUT).map_err(ProtoError::DialFailed)?;
        set_deadline(&conn, RECENT_REVISION_TIMEOUT)?;

        write_specifier(&mut conn, &rpc).map_err(wire_error)?;
        let (host_revision, host_signatures) = verify_recent_revision(&mut conn, &contract)?;
        contract.sync_with_host(host_revision, host_signatures)?;

        set_deadline(&conn, SESSION_IDLE_TIMEOUT)?;
        info!(
            host = %host.key,
            contract = %contract.id(),
            rpc = %rpc,
            "session opened"
        );
        Ok(Self {
            conn,
            addr,
            host_key: host.key,
            settings: host.settings.clone(),
            contract,
            current_height,
            host_stopped: false,
            closed: false,
        })
    }

    /// The contract this session revises.
    pub fn contract(&self) -> &ContractFile {
        &self.contract
    }

    /// The latest committed revision.
    pub fn current_revision(&self) -> &ContractRevision {
        self.contract.current_revision()
    }

    /// The session's cached host settings.
    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Whether the host asked the session to stop. Once set, further
    /// iterations fail with [`ProtoError::StopResponse`].
    pub fn host_stopped(&self) -> bool {
        self.host_stopped
    }

    /// Upload one full sector, negotiating a revision that pays for its
    /// storage and bandwidth. Returns the sector's Merkle root.
    pub fn upload(&mut self, sector: &[u8; SECTOR_SIZE]) -> Result<Hash> {
        self.ensure_ready()?;

        set_deadline(&self.conn, SETTINGS_TIMEOUT)?;
        start_revision(&mut self.conn, &mut self.settings, &self.host_key)?;
        set_deadline(&self.conn, SESSION_IDLE_TIMEOUT)?;

        let current = self.contract.current_revision();
        let duration = self
            .contract
            .end_height()
            .checked_sub(self.current_height)
            .filter(|d| *d > 0)
            .ok_or(ProtoError::ContractEnded)?;

        let sector_root = merkle::segments_root(sector.as_slice())?;
        let new_root = if current.file_size == 0 {
            sector_root
        } else {
            merkle::merkle_inner(&current.file_merkle_root, &sector_root)
        };

        let price = sector_price(
            self.settings.storage_price,
            self.settings.upload_bandwidth_price,
            duration,
        )?;
        let collateral = sector_collateral(
            self.settings.collateral_price,
            self.settings.max_collateral,
            current.missed_outputs[MISSED_HOST].value,
            duration,
        )?;
        let revision = new_upload_revision(current, new_root, price, collateral)?;
        let sector_index = current.file_size / SECTOR_SIZE as u64;

        write_upload_action(&mut self.conn, sector_index, sector.as_slice())
            .map_err(wire_error)?;
        self.conn.flush().map_err(transport_error)?;

        let (txn, host_stopped) =
            negotiate_revision(&mut self.conn, &revision, self.contract.renter_key())?;
        self.contract.sync_with_host(revision, txn.signatures)?;

        debug!(
            sector = sector_index,
            revision = self.contract.current_revision().revision_number,
            %price,
            %collateral,
            "sector uploaded"
        );
        if host_stopped {
            self.host_stopped = true;
        }
        Ok(sector_root)
    }

    /// Download `length` bytes at `offset` within the sector at
    /// `sector_index`, negotiating a revision that pays for the bandwidth.
    pub fn download(&mut self, sector_index: u64, offset: u32, length: u32) -> Result<Vec<u8>> {
        self.ensure_ready()?;
        if u64::from(offset) + u64::from(length) > SECTOR_SIZE as u64 {
            return Err(ProtoError::InvalidRange { offset, length });
        }

        set_deadline(&self.conn, SETTINGS_TIMEOUT)?;
        start_revision(&mut self.conn, &mut self.settings, &self.host_key)?;
        set_deadline(&self.conn, SESSION_IDLE_TIMEOUT)?;

        let price = self
            .settings
            .download_bandwidth_price
            .checked_mul(u64::from(length))
            .ok_or(ProtoError::PriceOverflow)?;
        let revision = new_download_revision(self.contract.current_revision(), price)?;

        let actions = ActionSet(vec![RevisionAction::download(
            sector_index,
            u64::from(offset),
            u64::from(length),
        )]);
        write_object(&mut self.conn, &actions).map_err(wire_error)?;

        let (txn, host_stopped) =
            negotiate_revision(&mut self.conn, &revision, self.contract.renter_key())?;

        // The host sends the data before we commit; an iteration that
        // never yields data must not be paid for.
        let data = read_prefixed(&mut self.conn, SECTOR_SIZE as u64).map_err(wire_error)?;
        if data.len() as u64 != u64::from(length) {
            return Err(ProtoError::BadDownloadLength {
                want: u64::from(length),
                got: data.len() as u64,
            });
        }

        self.contract.sync_with_host(revision, txn.signatures)?;
        debug!(
            sector = sector_index,
            offset,
            length,
            revision = self.contract.current_revision().revision_number,
            "range downloaded"
        );
        if host_stopped {
            self.host_stopped = true;
        }
        Ok(data)
    }

    /// Tear the session down: best-effort settings re-read, negotiation
    /// stop, socket shutdown. Closing an already-closed session is a
    /// no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let _ = set_deadline(&self.conn, SETTINGS_TIMEOUT);
        let _ = reread_settings(&mut self.conn, &self.host_key, &self.addr);
        let _ = write_response(&mut self.conn, Response::Stop);
        let _ = self.conn.shutdown(Shutdown::Both);
        info!(host = %self.host_key, contract = %self.contract.id(), "session closed");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.closed {
            return Err(ProtoError::SessionClosed);
        }
        if self.host_stopped {
            return Err(ProtoError::StopResponse);
        }
        Ok(())
    }
}

/// Price of storing one sector for `duration` blocks plus uploading it.
fn sector_price(
    storage_price: Currency,
    upload_price: Currency,
    duration: BlockHeight,
) -> Result<Currency> {
    let sector = SECTOR_SIZE as u64;
    let storage = storage_price
        .checked_mul(sector)
        .and_then(|c| c.checked_mul(duration))
        .ok_or(ProtoError::PriceOverflow)?;
    let bandwidth = upload_price
        .checked_mul(sector)
        .ok_or(ProtoError::PriceOverflow)?;
    storage.checked_add(bandwidth).ok_or(ProtoError::PriceOverflow)
}

/// Collateral the host stakes on one sector: its advertised rate over the
/// remaining duration, capped by its maximum and by what its missed
/// output still holds.
fn sector_collateral(
    collateral_price: Currency,
    max_collateral: Currency,
    host_missed: Currency,
    duration: BlockHeight,
) -> Result<Currency> {
    let offered = collateral_price
        .checked_mul(SECTOR_SIZE as u64)
        .and_then(|c| c.checked_mul(duration))
        .ok_or(ProtoError::PriceOverflow)?;
    Ok(offered.min(max_collateral).min(host_missed))
}

fn set_deadline(conn: &TcpStream, d: Duration) -> Result<()> {
    conn.set_read_timeout(Some(d)).map_err(transport_error)?;
    conn.set_write_timeout(Some(d)).map_err(transport_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_price_arithmetic() {
        let price = sector_price(Currency::new(2), Currency::new(1), 10).expect("price");
        let sector = SECTOR_SIZE as u128;
        assert_eq!(price, Currency::new(2 * sector * 10 + sector));
    }

    #[test]
    fn test_sector_price_overflow() {
        assert!(matches!(
            sector_price(Currency::new(u128::MAX), Currency::ZERO, 2),
            Err(ProtoError::PriceOverflow)
        ));
    }

    #[test]
    fn test_collateral_caps() {
        let sector = SECTOR_SIZE as u128;
        // Uncapped: rate * sector * duration.
        let c = sector_collateral(
            Currency::new(1),
            Currency::new(u128::MAX),
            Currency::new(u128::MAX),
            3,
        )
        .expect("collateral");
        assert_eq!(c, Currency::new(sector * 3));

        // Capped by the host's maximum.
        let c = sector_collateral(
            Currency::new(1),
            Currency::new(100),
            Currency::new(u128::MAX),
            3,
        )
        .expect("collateral");
        assert_eq!(c, Currency::new(100));

        // Capped by what the missed output still holds.
        let c = sector_collateral(
            Currency::new(1),
            Currency::new(u128::MAX),
            Currency::new(42),
            3,
        )
        .expect("collateral");
        assert_eq!(c, Currency::new(42));
    }
}
