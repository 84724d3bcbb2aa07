//! File contract revisions and proof outputs.
//!
//! A revision is a new version of a file contract: it re-divides the
//! contract's coins between renter, host, and the void, and commits to a
//! new file size and Merkle root. The parent ID and unlock conditions are
//! immutable; everything else may change, with the revision number
//! strictly increasing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::currency::Currency;
use crate::unlock::{Address, UnlockConditions};
use crate::{BlockHeight, Hash, Result, TypesError, SECTOR_SIZE};

/// Index of the renter's output among the valid proof outputs.
pub const VALID_RENTER: usize = 0;
/// Index of the host's output among the valid proof outputs.
pub const VALID_HOST: usize = 1;
/// Index of the renter's output among the missed proof outputs.
pub const MISSED_RENTER: usize = 0;
/// Index of the host's output among the missed proof outputs.
pub const MISSED_HOST: usize = 1;
/// Index of the void output among the missed proof outputs.
pub const MISSED_VOID: usize = 2;

macro_rules! hash_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Hash);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl std::str::FromStr for $name {
            type Err = hex::FromHexError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let bytes = hex::decode(s)?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hash_id!(ContractId, "Identifier of a file contract.");
hash_id!(OutputId, "Identifier of a spendable output.");

/// A coin output: an amount payable to an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: Currency,
    pub address: Address,
}

/// One version of a file contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRevision {
    /// The contract being revised. Immutable.
    pub parent_id: ContractId,
    /// Conditions under which this revision is authorized. Immutable.
    pub unlock_conditions: UnlockConditions,
    /// Strictly increasing per contract.
    pub revision_number: u64,
    /// Total stored bytes; always a multiple of the sector size.
    pub file_size: u64,
    /// Merkle root over all of the contract's sectors.
    pub file_merkle_root: Hash,
    /// Payouts if the host proves storage: `[renter, host]`.
    pub valid_outputs: Vec<Output>,
    /// Payouts if the host fails to prove: `[renter, host, void]`.
    pub missed_outputs: Vec<Output>,
    /// First block of the proof window.
    pub window_start: BlockHeight,
    /// Last block of the proof window.
    pub window_end: BlockHeight,
}

impl ContractRevision {
    /// Sum of the valid proof outputs.
    pub fn total_valid(&self) -> Option<Currency> {
        self.valid_outputs
            .iter()
            .try_fold(Currency::ZERO, |acc, o| acc.checked_add(o.value))
    }

    /// Sum of the missed proof outputs.
    pub fn total_missed(&self) -> Option<Currency> {
        self.missed_outputs
            .iter()
            .try_fold(Currency::ZERO, |acc, o| acc.checked_add(o.value))
    }

    /// Check the structural invariants that hold for every revision:
    /// standard output counts, payout conservation, and sector-aligned
    /// file size.
    pub fn check_invariants(&self) -> Result<()> {
        if self.valid_outputs.len() != 2 || self.missed_outputs.len() != 3 {
            return Err(TypesError::MalformedOutputs);
        }
        let valid = self.total_valid().ok_or(TypesError::CoinImbalance)?;
        let missed = self.total_missed().ok_or(TypesError::CoinImbalance)?;
        if valid != missed {
            return Err(TypesError::CoinImbalance);
        }
        if self.file_size % SECTOR_SIZE as u64 != 0 {
            return Err(TypesError::MisalignedFileSize(self.file_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(value: u128) -> Output {
        Output {
            value: Currency::new(value),
            address: Address([0u8; 32]),
        }
    }

    fn revision() -> ContractRevision {
        ContractRevision {
            parent_id: ContractId([1u8; 32]),
            unlock_conditions: UnlockConditions {
                timelock: 0,
                public_keys: Vec::new(),
                signatures_required: 0,
            },
            revision_number: 1,
            file_size: 0,
            file_merkle_root: [0u8; 32],
            valid_outputs: vec![output(60), output(40)],
            missed_outputs: vec![output(60), output(30), output(10)],
            window_start: 100,
            window_end: 200,
        }
    }

    #[test]
    fn test_invariants_hold() {
        revision().check_invariants().expect("valid revision");
    }

    #[test]
    fn test_imbalance_detected() {
        let mut rev = revision();
        rev.missed_outputs[MISSED_VOID].value = Currency::new(11);
        assert!(matches!(
            rev.check_invariants(),
            Err(TypesError::CoinImbalance)
        ));
    }

    #[test]
    fn test_misaligned_file_size_detected() {
        let mut rev = revision();
        rev.file_size = 100;
        assert!(matches!(
            rev.check_invariants(),
            Err(TypesError::MisalignedFileSize(100))
        ));
    }

    #[test]
    fn test_output_count_enforced() {
        let mut rev = revision();
        rev.missed_outputs.pop();
        assert!(matches!(
            rev.check_invariants(),
            Err(TypesError::MalformedOutputs)
        ));
    }

    #[test]
    fn test_contract_id_roundtrip() {
        let id = ContractId([0xCD; 32]);
        assert_eq!(id.to_string().parse::<ContractId>().expect("parse"), id);
    }
}
