//! Transactions and their signatures.
//!
//! The revision protocol exchanges transactions containing exactly one
//! contract revision plus the renter's and host's signatures over it. The
//! wallet-facing side additionally carries coin inputs and outputs so the
//! same type serves both roles.

use serde::{Deserialize, Serialize};

use tessera_crypto::ed25519::{Signature, SigningKey, VerifyingKey};
use tessera_crypto::hashing;
use tessera_wire::{Encoder, WireEncode};

use crate::currency::Currency;
use crate::revision::{ContractRevision, Output, OutputId};
use crate::unlock::{UnlockConditions, ALGORITHM_ED25519};
use crate::{BlockHeight, Hash, Result, TypesError};

/// A coin input: a spendable output plus the conditions that unlock it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub parent_id: OutputId,
    pub unlock_conditions: UnlockConditions,
}

/// A spendable output tracked by a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub id: OutputId,
    pub address: crate::unlock::Address,
    pub value: Currency,
}

/// Which parts of a transaction a signature covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredFields {
    /// Covers everything except the signatures themselves.
    pub whole_transaction: bool,
    /// Indices of covered revisions (ignored when `whole_transaction`).
    pub revisions: Vec<u64>,
    /// Indices of covered signatures.
    pub signatures: Vec<u64>,
}

impl CoveredFields {
    /// Cover the whole transaction.
    pub fn whole() -> Self {
        Self {
            whole_transaction: true,
            revisions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Cover only the revision at `index`.
    pub fn revision(index: u64) -> Self {
        Self {
            whole_transaction: false,
            revisions: vec![index],
            signatures: Vec::new(),
        }
    }
}

/// A signature authorizing part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// The input or revision parent this signature spends.
    pub parent_id: Hash,
    /// Which key of the parent's unlock conditions signed.
    pub public_key_index: u64,
    /// Earliest height at which this signature is valid.
    pub timelock: BlockHeight,
    pub covered_fields: CoveredFields,
    /// Raw 64-byte Ed25519 signature.
    pub signature: Vec<u8>,
}

/// A transaction: coin movements, contract revisions, and signatures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub miner_fees: Vec<Currency>,
    pub revisions: Vec<ContractRevision>,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// The message signed by signature `index`: a domain-separated hash of
    /// the covered fields plus the signature's own metadata.
    pub fn sig_hash(&self, index: usize) -> Result<Hash> {
        let sig = self
            .signatures
            .get(index)
            .ok_or(TypesError::CoveredFieldOutOfRange(index as u64))?;

        let mut enc = Encoder::new();
        if sig.covered_fields.whole_transaction {
            enc.write_seq(&self.inputs);
            enc.write_seq(&self.outputs);
            enc.write_seq(&self.miner_fees);
            enc.write_seq(&self.revisions);
        } else {
            for &i in &sig.covered_fields.revisions {
                let rev = self
                    .revisions
                    .get(i as usize)
                    .ok_or(TypesError::CoveredFieldOutOfRange(i))?;
                rev.encode(&mut enc);
            }
            for &i in &sig.covered_fields.signatures {
                let s = self
                    .signatures
                    .get(i as usize)
                    .ok_or(TypesError::CoveredFieldOutOfRange(i))?;
                s.encode(&mut enc);
            }
        }
        enc.write_raw(&sig.parent_id);
        enc.write_u64(sig.public_key_index);
        enc.write_u64(sig.timelock);

        let key = hashing::derive_key(hashing::contexts::SIG_HASH, b"");
        Ok(hashing::keyed_hash(&key, &enc.into_bytes()))
    }

    /// Sign the signature slot at `index` with `key`, filling in its
    /// signature bytes.
    pub fn sign(&mut self, index: usize, key: &SigningKey) -> Result<()> {
        let hash = self.sig_hash(index)?;
        let sig = key.sign(&hash);
        self.signatures[index].signature = sig.to_bytes().to_vec();
        Ok(())
    }

    /// Validate this transaction in isolation at the given height.
    ///
    /// Checks every revision's structural invariants, then verifies every
    /// signature against its parent's unlock conditions, and finally
    /// requires each revision's signature threshold to be met.
    pub fn standalone_valid(&self, height: BlockHeight) -> Result<()> {
        for rev in &self.revisions {
            rev.check_invariants()?;
        }

        for (i, sig) in self.signatures.iter().enumerate() {
            let conditions = self
                .parent_conditions(&sig.parent_id)
                .ok_or(TypesError::MissingSignatureTarget)?;
            if conditions.timelock > height || sig.timelock > height {
                return Err(TypesError::PrematureSignature {
                    timelock: conditions.timelock.max(sig.timelock),
                    height,
                });
            }
            let spec = conditions
                .public_keys
                .get(sig.public_key_index as usize)
                .ok_or(TypesError::PublicKeyIndexOutOfRange(sig.public_key_index))?;
            if spec.algorithm != ALGORITHM_ED25519 {
                return Err(TypesError::UnknownAlgorithm(spec.algorithm.to_string()));
            }
            let key_bytes: [u8; 32] = spec
                .key
                .as_slice()
                .try_into()
                .map_err(|_| TypesError::InvalidPublicKey)?;
            let key =
                VerifyingKey::from_bytes(&key_bytes).map_err(|_| TypesError::InvalidPublicKey)?;
            let sig_bytes: [u8; 64] = sig
                .signature
                .as_slice()
                .try_into()
                .map_err(|_| TypesError::SignatureInvalid)?;
            key.verify(&self.sig_hash(i)?, &Signature::from_bytes(&sig_bytes))
                .map_err(|_| TypesError::SignatureInvalid)?;
        }

        for rev in &self.revisions {
            let required = rev.unlock_conditions.signatures_required;
            let mut signers: Vec<u64> = self
                .signatures
                .iter()
                .filter(|sig| sig.parent_id == rev.parent_id.0)
                .map(|sig| sig.public_key_index)
                .collect();
            signers.sort_unstable();
            signers.dedup();
            let got = signers.len() as u64;
            if got < required {
                return Err(TypesError::MissingSignatures { required, got });
            }
        }

        Ok(())
    }

    fn parent_conditions(&self, parent_id: &Hash) -> Option<&UnlockConditions> {
        for rev in &self.revisions {
            if rev.parent_id.0 == *parent_id {
                return Some(&rev.unlock_conditions);
            }
        }
        for input in &self.inputs {
            if input.parent_id.0 == *parent_id {
                return Some(&input.unlock_conditions);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::ContractId;
    use crate::unlock::Address;

    fn output(value: u128) -> Output {
        Output {
            value: Currency::new(value),
            address: Address([0u8; 32]),
        }
    }

    fn revision_transaction() -> (Transaction, SigningKey, SigningKey) {
        let renter = SigningKey::generate();
        let host = SigningKey::generate();
        let parent_id = ContractId([7u8; 32]);
        let rev = ContractRevision {
            parent_id,
            unlock_conditions: UnlockConditions::standard(
                &renter.verifying_key(),
                &host.verifying_key(),
            ),
            revision_number: 3,
            file_size: 0,
            file_merkle_root: [0u8; 32],
            valid_outputs: vec![output(70), output(30)],
            missed_outputs: vec![output(70), output(20), output(10)],
            window_start: 1000,
            window_end: 1100,
        };
        let txn = Transaction {
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
        (txn, renter, host)
    }

    #[test]
    fn test_fully_signed_transaction_valid() {
        let (mut txn, renter, host) = revision_transaction();
        txn.sign(0, &renter).expect("sign renter");
        txn.sign(1, &host).expect("sign host");
        txn.standalone_valid(999).expect("valid");
    }

    #[test]
    fn test_missing_host_signature_detected() {
        let (mut txn, renter, _) = revision_transaction();
        txn.sign(0, &renter).expect("sign renter");
        txn.signatures.truncate(1);
        assert!(matches!(
            txn.standalone_valid(999),
            Err(TypesError::MissingSignatures {
                required: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_wrong_signer_detected() {
        let (mut txn, renter, _) = revision_transaction();
        let impostor = SigningKey::generate();
        txn.sign(0, &renter).expect("sign renter");
        txn.sign(1, &impostor).expect("sign impostor");
        assert!(matches!(
            txn.standalone_valid(999),
            Err(TypesError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_sig_hash_covers_revision() {
        let (mut txn, renter, host) = revision_transaction();
        txn.sign(0, &renter).expect("sign renter");
        txn.sign(1, &host).expect("sign host");
        txn.revisions[0].revision_number += 1;
        assert!(txn.standalone_valid(999).is_err());
    }

    #[test]
    fn test_unknown_parent_detected() {
        let (mut txn, renter, host) = revision_transaction();
        txn.sign(0, &renter).expect("sign renter");
        txn.sign(1, &host).expect("sign host");
        txn.signatures[0].parent_id = [9u8; 32];
        assert!(matches!(
            txn.standalone_valid(999),
            Err(TypesError::MissingSignatureTarget)
        ));
    }

    #[test]
    fn test_timelock_enforced() {
        let (mut txn, renter, host) = revision_transaction();
        txn.signatures[0].timelock = 2000;
        txn.sign(0, &renter).expect("sign renter");
        txn.sign(1, &host).expect("sign host");
        assert!(matches!(
            txn.standalone_valid(999),
            Err(TypesError::PrematureSignature { .. })
        ));
        txn.standalone_valid(2001).expect("valid after timelock");
    }
}
