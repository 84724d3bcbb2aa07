//! On-disk contract store.
//!
//! A contract lives in a single file holding the formation transaction,
//! the renter's secret key, and the latest committed revision with both
//! parties' signatures. The file is rewritten atomically (temp file, then
//! rename) and guarded by an advisory OS lock so that two processes can
//! never revise the same contract.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use tessera_crypto::ed25519::SigningKey;
use tessera_types::{
    BlockHeight, ContractId, ContractRevision, HostPublicKey, Transaction, TransactionSignature,
};
use tessera_wire::{Decoder, Encoder, WireDecode, WireEncode};

use crate::{ProtoError, Result};

/// A file-backed contract: formation transaction, renter secret key, and
/// the latest committed revision with its signatures.
pub struct ContractFile {
    path: PathBuf,
    // Held for the lifetime of the store; dropping releases the advisory
    // lock.
    _lock: File,
    transaction: Transaction,
    renter_key: SigningKey,
    revision: ContractRevision,
    signatures: Vec<TransactionSignature>,
}

impl ContractFile {
    /// Create a new contract file from a formation transaction.
    ///
    /// The transaction must contain the initial revision and both
    /// formation signatures.
    pub fn create(
        path: impl AsRef<Path>,
        transaction: Transaction,
        renter_key: SigningKey,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let revision = transaction
            .revisions
            .first()
            .cloned()
            .ok_or_else(|| ProtoError::ContractStore("transaction has no revision".into()))?;
        let signatures = transaction.signatures.clone();

        let lock = acquire_lock(&path)?;
        let store = Self {
            path,
            _lock: lock,
            transaction,
            renter_key,
            revision,
            signatures,
        };
        store.save()?;
        Ok(store)
    }

    /// Open and lock an existing contract file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&path)?;
        let bytes = std::fs::read(&path).map_err(|e| ProtoError::ContractStore(e.to_string()))?;

        let mut dec = Decoder::new(&bytes);
        let transaction =
            Transaction::decode(&mut dec).map_err(|e| ProtoError::ContractStore(e.to_string()))?;
        let key_bytes: [u8; 32] = dec
            .read_array()
            .map_err(|e| ProtoError::ContractStore(e.to_string()))?;
        let revision = ContractRevision::decode(&mut dec)
            .map_err(|e| ProtoError::ContractStore(e.to_string()))?;
        let signatures: Vec<TransactionSignature> = dec
            .read_seq()
            .map_err(|e| ProtoError::ContractStore(e.to_string()))?;
        dec.finish()
            .map_err(|e| ProtoError::ContractStore(e.to_string()))?;

        Ok(Self {
            path,
            _lock: lock,
            transaction,
            renter_key: SigningKey::from_bytes(&key_bytes),
            revision,
            signatures,
        })
    }

    /// The contract's identifier.
    pub fn id(&self) -> ContractId {
        self.revision.parent_id
    }

    /// The formation transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// The latest committed revision.
    pub fn current_revision(&self) -> &ContractRevision {
        &self.revision
    }

    /// Signatures over the latest committed revision.
    pub fn signatures(&self) -> &[TransactionSignature] {
        &self.signatures
    }

    /// The renter's secret key for this contract.
    pub fn renter_key(&self) -> &SigningKey {
        &self.renter_key
    }

    /// The host's public key, taken from the contract's unlock conditions.
    /// The renter key is always first; the host key second.
    pub fn host_key(&self) -> Result<HostPublicKey> {
        let spec = self
            .revision
            .unlock_conditions
            .public_keys
            .get(1)
            .ok_or_else(|| ProtoError::ContractStore("missing host key".into()))?;
        let bytes: [u8; 32] = spec
            .key
            .as_slice()
            .try_into()
            .map_err(|_| ProtoError::ContractStore("malformed host key".into()))?;
        Ok(HostPublicKey::from_bytes(bytes))
    }

    /// The height at which the contract ends and its proof window opens.
    pub fn end_height(&self) -> BlockHeight {
        self.revision.window_start
    }

    /// Adopt a revision the host has presented, if it is ours or a valid
    /// successor. Commits to disk before returning.
    pub fn sync_with_host(
        &mut self,
        revision: ContractRevision,
        signatures: Vec<TransactionSignature>,
    ) -> Result<()> {
        if revision.unlock_conditions.unlock_hash() != self.revision.unlock_conditions.unlock_hash()
        {
            return Err(ProtoError::UnlockHashMismatch);
        }
        if revision.parent_id != self.revision.parent_id
            || revision.revision_number < self.revision.revision_number
        {
            return Err(ProtoError::ContractDesync);
        }

        self.revision = revision;
        self.signatures = signatures;
        self.save()?;
        debug!(
            contract = %self.id(),
            revision = self.revision.revision_number,
            "contract synchronized"
        );
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let mut enc = Encoder::new();
        self.transaction.encode(&mut enc);
        enc.write_raw(&self.renter_key.to_bytes());
        self.revision.encode(&mut enc);
        enc.write_seq(&self.signatures);
        let bytes = enc.into_bytes();

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(ProtoError::ContractPersist)?;
        tmp.write_all(&bytes).map_err(ProtoError::ContractPersist)?;
        tmp.as_file()
            .sync_all()
            .map_err(ProtoError::ContractPersist)?;
        tmp.persist(&self.path)
            .map_err(|e| ProtoError::ContractPersist(e.error))?;
        Ok(())
    }
}

impl std::fmt::Debug for ContractFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractFile")
            .field("path", &self.path)
            .field("id", &self.id())
            .field("revision", &self.revision.revision_number)
            .finish()
    }
}

fn acquire_lock(path: &Path) -> Result<File> {
    let lock_path = PathBuf::from(format!("{}.lock", path.display()));
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| ProtoError::ContractStore(e.to_string()))?;
    lock.try_lock_exclusive()
        .map_err(|_| ProtoError::ContractStore("contract is locked by another process".into()))?;
    Ok(lock)
}

/// Decode a contract file without taking the lock. Used by read-only
/// inspection in tests and tooling.
pub fn peek_revision(path: impl AsRef<Path>) -> Result<ContractRevision> {
    let bytes =
        std::fs::read(path.as_ref()).map_err(|e| ProtoError::ContractStore(e.to_string()))?;
    let mut dec = Decoder::new(&bytes);
    let _ = Transaction::decode(&mut dec).map_err(|e| ProtoError::ContractStore(e.to_string()))?;
    let _: [u8; 32] = dec
        .read_array()
        .map_err(|e| ProtoError::ContractStore(e.to_string()))?;
    ContractRevision::decode(&mut dec).map_err(|e| ProtoError::ContractStore(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::{
        Address, CoveredFields, Currency, Output, UnlockConditions,
    };

    fn output(value: u128) -> Output {
        Output {
            value: Currency::new(value),
            address: Address([0u8; 32]),
        }
    }

    fn formation(renter: &SigningKey, host: &SigningKey) -> Transaction {
        let parent_id = ContractId([5u8; 32]);
        let rev = ContractRevision {
            parent_id,
            unlock_conditions: UnlockConditions::standard(
                &renter.verifying_key(),
                &host.verifying_key(),
            ),
            revision_number: 0,
            file_size: 0,
            file_merkle_root: [0u8; 32],
            valid_outputs: vec![output(1000), output(0)],
            missed_outputs: vec![output(1000), output(0), output(0)],
            window_start: 5000,
            window_end: 5144,
        };
        let mut txn = Transaction {
            revisions: vec![rev],
            signatures: vec![
                TransactionSignature {
                    parent_id: parent_id.0,
                    public_key_index: 0,
                    timelock: 0,
                    covered_fields: CoveredFields::revision(0),
                    signature: Vec::new(),
                },
                TransactionSignature {
                    parent_id: parent_id.0,
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

    #[test]
    fn test_create_and_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.contract");
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let txn = formation(&renter, &host);

        let store = ContractFile::create(&path, txn.clone(), renter.clone()).expect("create");
        let id = store.id();
        drop(store);

        let store = ContractFile::open(&path).expect("open");
        assert_eq!(store.id(), id);
        assert_eq!(store.current_revision().revision_number, 0);
        assert_eq!(store.end_height(), 5000);
        assert_eq!(store.renter_key().to_bytes(), renter.to_bytes());
        assert_eq!(
            store.host_key().expect("host key").as_bytes(),
            &host.verifying_key().to_bytes()
        );
    }

    #[test]
    fn test_lock_excludes_second_opener() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.contract");
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let store =
            ContractFile::create(&path, formation(&renter, &host), renter.clone()).expect("create");

        assert!(ContractFile::open(&path).is_err());
        drop(store);
        ContractFile::open(&path).expect("open after release");
    }

    #[test]
    fn test_sync_accepts_successor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.contract");
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let mut store =
            ContractFile::create(&path, formation(&renter, &host), renter.clone()).expect("create");

        let mut next = store.current_revision().clone();
        next.revision_number = 4;
        store
            .sync_with_host(next, Vec::new())
            .expect("sync succeeds");
        assert_eq!(store.current_revision().revision_number, 4);

        // The successor reached disk.
        assert_eq!(peek_revision(&path).expect("peek").revision_number, 4);
    }

    #[test]
    fn test_sync_rejects_regression() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.contract");
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let mut store =
            ContractFile::create(&path, formation(&renter, &host), renter.clone()).expect("create");

        let mut next = store.current_revision().clone();
        next.revision_number = 9;
        store.sync_with_host(next, Vec::new()).expect("sync");

        let mut stale = store.current_revision().clone();
        stale.revision_number = 3;
        assert!(matches!(
            store.sync_with_host(stale, Vec::new()),
            Err(ProtoError::ContractDesync)
        ));
        assert_eq!(store.current_revision().revision_number, 9);
    }

    #[test]
    fn test_sync_rejects_foreign_unlock_conditions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("host.contract");
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let mut store =
            ContractFile::create(&path, formation(&renter, &host), renter.clone()).expect("create");

        let mut foreign = store.current_revision().clone();
        foreign.revision_number = 10;
        foreign.unlock_conditions = UnlockConditions::standard(
            &SigningKey::generate().verifying_key(),
            &SigningKey::generate().verifying_key(),
        );
        assert!(matches!(
            store.sync_with_host(foreign, Vec::new()),
            Err(ProtoError::UnlockHashMismatch)
        ));
        assert_eq!(store.current_revision().revision_number, 0);
        assert_eq!(peek_revision(&path).expect("peek").revision_number, 0);
    }
}
