//! Canonical wire encodings for the domain types.
//!
//! Field order follows declaration order in each struct; this encoding is
//! what signatures, unlock hashes, and on-disk records are computed over,
//! so it must never change shape.

use tessera_wire::{Decoder, Encoder, Result, WireDecode, WireEncode};

use crate::currency::Currency;
use crate::host::{HostAnnouncement, HostPublicKey, HostSettings};
use crate::revision::{ContractId, ContractRevision, Output, OutputId};
use crate::transaction::{CoveredFields, Input, Transaction, TransactionSignature};
use crate::unlock::{Address, KeySpec, UnlockConditions};

impl WireEncode for Currency {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u128(self.value());
    }
}

impl WireDecode for Currency {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Currency::new(dec.read_u128()?))
    }
}

impl WireEncode for Address {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(&self.0);
    }
}

impl WireDecode for Address {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Address(dec.read_array()?))
    }
}

impl WireEncode for ContractId {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(&self.0);
    }
}

impl WireDecode for ContractId {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(ContractId(dec.read_array()?))
    }
}

impl WireEncode for OutputId {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(&self.0);
    }
}

impl WireDecode for OutputId {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(OutputId(dec.read_array()?))
    }
}

impl WireEncode for HostPublicKey {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(self.as_bytes());
    }
}

impl WireDecode for HostPublicKey {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(HostPublicKey::from_bytes(dec.read_array()?))
    }
}

impl WireEncode for KeySpec {
    fn encode(&self, enc: &mut Encoder) {
        self.algorithm.encode(enc);
        enc.write_prefixed(&self.key);
    }
}

impl WireDecode for KeySpec {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(KeySpec {
            algorithm: WireDecode::decode(dec)?,
            key: dec.read_prefixed()?.to_vec(),
        })
    }
}

impl WireEncode for UnlockConditions {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_u64(self.timelock);
        enc.write_seq(&self.public_keys);
        enc.write_u64(self.signatures_required);
    }
}

impl WireDecode for UnlockConditions {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(UnlockConditions {
            timelock: dec.read_u64()?,
            public_keys: dec.read_seq()?,
            signatures_required: dec.read_u64()?,
        })
    }
}

impl WireEncode for Output {
    fn encode(&self, enc: &mut Encoder) {
        self.value.encode(enc);
        self.address.encode(enc);
    }
}

impl WireDecode for Output {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Output {
            value: WireDecode::decode(dec)?,
            address: WireDecode::decode(dec)?,
        })
    }
}

impl WireEncode for ContractRevision {
    fn encode(&self, enc: &mut Encoder) {
        self.parent_id.encode(enc);
        self.unlock_conditions.encode(enc);
        enc.write_u64(self.revision_number);
        enc.write_u64(self.file_size);
        enc.write_raw(&self.file_merkle_root);
        enc.write_seq(&self.valid_outputs);
        enc.write_seq(&self.missed_outputs);
        enc.write_u64(self.window_start);
        enc.write_u64(self.window_end);
    }
}

impl WireDecode for ContractRevision {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(ContractRevision {
            parent_id: WireDecode::decode(dec)?,
            unlock_conditions: WireDecode::decode(dec)?,
            revision_number: dec.read_u64()?,
            file_size: dec.read_u64()?,
            file_merkle_root: dec.read_array()?,
            valid_outputs: dec.read_seq()?,
            missed_outputs: dec.read_seq()?,
            window_start: dec.read_u64()?,
            window_end: dec.read_u64()?,
        })
    }
}

impl WireEncode for CoveredFields {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bool(self.whole_transaction);
        enc.write_seq(&self.revisions);
        enc.write_seq(&self.signatures);
    }
}

impl WireDecode for CoveredFields {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(CoveredFields {
            whole_transaction: dec.read_bool()?,
            revisions: dec.read_seq()?,
            signatures: dec.read_seq()?,
        })
    }
}

impl WireEncode for TransactionSignature {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_raw(&self.parent_id);
        enc.write_u64(self.public_key_index);
        enc.write_u64(self.timelock);
        self.covered_fields.encode(enc);
        enc.write_prefixed(&self.signature);
    }
}

impl WireDecode for TransactionSignature {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(TransactionSignature {
            parent_id: dec.read_array()?,
            public_key_index: dec.read_u64()?,
            timelock: dec.read_u64()?,
            covered_fields: WireDecode::decode(dec)?,
            signature: dec.read_prefixed()?.to_vec(),
        })
    }
}

impl WireEncode for Input {
    fn encode(&self, enc: &mut Encoder) {
        self.parent_id.encode(enc);
        self.unlock_conditions.encode(enc);
    }
}

impl WireDecode for Input {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Input {
            parent_id: WireDecode::decode(dec)?,
            unlock_conditions: WireDecode::decode(dec)?,
        })
    }
}

impl WireEncode for Transaction {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_seq(&self.inputs);
        enc.write_seq(&self.outputs);
        enc.write_seq(&self.miner_fees);
        enc.write_seq(&self.revisions);
        enc.write_seq(&self.signatures);
    }
}

impl WireDecode for Transaction {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(Transaction {
            inputs: dec.read_seq()?,
            outputs: dec.read_seq()?,
            miner_fees: dec.read_seq()?,
            revisions: dec.read_seq()?,
            signatures: dec.read_seq()?,
        })
    }
}

impl WireEncode for HostSettings {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_bool(self.accepting_contracts);
        enc.write_str(&self.net_address);
        enc.write_u64(self.max_duration);
        enc.write_u64(self.window_size);
        self.max_collateral.encode(enc);
        self.collateral_price.encode(enc);
        self.contract_price.encode(enc);
        self.storage_price.encode(enc);
        self.upload_bandwidth_price.encode(enc);
        self.download_bandwidth_price.encode(enc);
        enc.write_u64(self.sector_size);
        enc.write_u64(self.max_revision_number);
    }
}

impl WireDecode for HostSettings {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(HostSettings {
            accepting_contracts: dec.read_bool()?,
            net_address: dec.read_str()?,
            max_duration: dec.read_u64()?,
            window_size: dec.read_u64()?,
            max_collateral: WireDecode::decode(dec)?,
            collateral_price: WireDecode::decode(dec)?,
            contract_price: WireDecode::decode(dec)?,
            storage_price: WireDecode::decode(dec)?,
            upload_bandwidth_price: WireDecode::decode(dec)?,
            download_bandwidth_price: WireDecode::decode(dec)?,
            sector_size: dec.read_u64()?,
            max_revision_number: dec.read_u64()?,
        })
    }
}

impl WireEncode for HostAnnouncement {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_str(&self.net_address);
        self.public_key.encode(enc);
    }
}

impl WireDecode for HostAnnouncement {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        Ok(HostAnnouncement {
            net_address: dec.read_str()?,
            public_key: WireDecode::decode(dec)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unlock::ALGORITHM_ED25519;
    use tessera_wire::{from_bytes, to_bytes};

    fn sample_revision() -> ContractRevision {
        ContractRevision {
            parent_id: ContractId([3u8; 32]),
            unlock_conditions: UnlockConditions {
                timelock: 5,
                public_keys: vec![KeySpec {
                    algorithm: ALGORITHM_ED25519,
                    key: vec![0xEE; 32],
                }],
                signatures_required: 1,
            },
            revision_number: 9,
            file_size: crate::SECTOR_SIZE as u64,
            file_merkle_root: [0x44; 32],
            valid_outputs: vec![Output {
                value: Currency::new(123),
                address: Address([1u8; 32]),
            }],
            missed_outputs: Vec::new(),
            window_start: 10,
            window_end: 20,
        }
    }

    #[test]
    fn test_revision_roundtrip() {
        let rev = sample_revision();
        let bytes = to_bytes(&rev);
        let back: ContractRevision = from_bytes(&bytes).expect("decode");
        assert_eq!(back, rev);
    }

    #[test]
    fn test_transaction_roundtrip() {
        let txn = Transaction {
            inputs: vec![Input {
                parent_id: OutputId([8u8; 32]),
                unlock_conditions: UnlockConditions {
                    timelock: 0,
                    public_keys: Vec::new(),
                    signatures_required: 1,
                },
            }],
            outputs: Vec::new(),
            miner_fees: vec![Currency::new(55)],
            revisions: vec![sample_revision()],
            signatures: vec![TransactionSignature {
                parent_id: [3u8; 32],
                public_key_index: 0,
                timelock: 7,
                covered_fields: CoveredFields::whole(),
                signature: vec![0xAB; 64],
            }],
        };
        let bytes = to_bytes(&txn);
        let back: Transaction = from_bytes(&bytes).expect("decode");
        assert_eq!(back, txn);
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = HostSettings {
            accepting_contracts: true,
            net_address: "host.example:9982".into(),
            max_duration: 144 * 90,
            window_size: 144,
            max_collateral: Currency::new(1_000_000),
            collateral_price: Currency::new(1),
            contract_price: Currency::new(50),
            storage_price: Currency::new(2),
            upload_bandwidth_price: Currency::new(1),
            download_bandwidth_price: Currency::new(3),
            sector_size: crate::SECTOR_SIZE as u64,
            max_revision_number: u64::MAX,
        };
        let bytes = to_bytes(&settings);
        let back: HostSettings = from_bytes(&bytes).expect("decode");
        assert_eq!(back, settings);
    }

    #[test]
    fn test_announcement_roundtrip() {
        let ann = HostAnnouncement {
            net_address: "host.example:9982".into(),
            public_key: HostPublicKey::from_bytes([0xCC; 32]),
        };
        let back: HostAnnouncement = from_bytes(&to_bytes(&ann)).expect("decode");
        assert_eq!(back, ann);
    }

    #[test]
    fn test_truncated_input_rejected() {
        let bytes = to_bytes(&sample_revision());
        assert!(from_bytes::<ContractRevision>(&bytes[..bytes.len() - 1]).is_err());
    }
}
