//! Client for the split wallet deployment.
//!
//! An external wallet server tracks addresses, outputs, and broadcasts,
//! but never sees a key: the client holds a 32-byte seed in memory and
//! derives one signing key per address index. Signing therefore happens
//! locally, in one of two modes:
//!
//! - **lazy** (`to_sign` empty): append a standard signature for every
//!   input whose address we own, silently skipping inputs we do not.
//! - **explicit**: fill exactly the requested signature slots; a target
//!   we cannot resolve or do not own is an error.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tessera_crypto::seed::Seed;
use tessera_proto::{TransactionPool, Wallet};
use tessera_types::{
    Address, Currency, Hash, Transaction, TransactionSignature, UnlockConditions, UnspentOutput,
};
use tessera_types::CoveredFields;

use crate::{ClientError, Result};

/// A client pairing an external wallet server with an in-memory seed.
pub struct WalletClient {
    base: String,
    client: Client,
    seed: Seed,
}

/// What the wallet server knows about one of our addresses.
#[derive(Serialize, Deserialize)]
struct AddressInfo {
    address: Address,
    key_index: u64,
    unlock_conditions: UnlockConditions,
}

impl WalletClient {
    /// A client for the wallet server at `base`, signing from `seed`.
    pub fn new(base: impl Into<String>, seed: Seed) -> Self {
        Self {
            base: base.into(),
            client: Client::new(),
            seed,
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base, route)
    }

    fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status.as_u16() == 404 {
            return Err(ClientError::NotFound);
        }
        let message = resp.text().unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        Ok(Self::check(self.client.get(self.url(route)).send()?)?.json()?)
    }

    fn seed_index(&self) -> Result<u64> {
        self.get("/seedindex")
    }

    fn address_info(&self, addr: Address) -> Result<AddressInfo> {
        self.get(&format!("/addresses/{addr}"))
    }

    /// The address an explicit signing target spends from, found among
    /// the transaction's inputs and revisions.
    fn sig_addr(txn: &Transaction, parent: &Hash) -> Option<Address> {
        for input in &txn.inputs {
            if input.parent_id.0 == *parent {
                return Some(input.unlock_conditions.unlock_hash());
            }
        }
        for rev in &txn.revisions {
            if rev.parent_id.0 == *parent {
                return Some(rev.unlock_conditions.unlock_hash());
            }
        }
        None
    }
}

impl Wallet for WalletClient {
    type Error = ClientError;

    /// Derive the next address from the seed and register it with the
    /// wallet server before returning it.
    fn new_address(&self) -> Result<Address> {
        let index = self.seed_index()?;
        let key = self.seed.key_at(index);
        let unlock_conditions = UnlockConditions::single(&key.verifying_key());
        let address = unlock_conditions.unlock_hash();

        let info = AddressInfo {
            address,
            key_index: index,
            unlock_conditions,
        };
        Self::check(
            self.client
                .put(self.url("/addresses"))
                .json(&info)
                .send()?,
        )?;
        Ok(address)
    }

    fn sign_transaction(&self, txn: &mut Transaction, to_sign: &[Hash]) -> Result<()> {
        if to_sign.is_empty() {
            // Lazy mode: a standard signature for every input we own.
            let inputs = txn.inputs.clone();
            for input in inputs {
                let addr = input.unlock_conditions.unlock_hash();
                let info = match self.address_info(addr) {
                    Ok(info) => info,
                    Err(ClientError::NotFound) => continue,
                    Err(err) => return Err(err),
                };
                let slot = txn.signatures.len();
                txn.signatures.push(TransactionSignature {
                    parent_id: input.parent_id.0,
                    public_key_index: 0,
                    timelock: 0,
                    covered_fields: CoveredFields::whole(),
                    signature: Vec::new(),
                });
                txn.sign(slot, &self.seed.key_at(info.key_index))?;
            }
            return Ok(());
        }

        for parent in to_sign {
            let slot = txn
                .signatures
                .iter()
                .position(|sig| sig.parent_id == *parent)
                .ok_or(ClientError::UnknownSigTarget)?;
            let addr = Self::sig_addr(txn, parent).ok_or(ClientError::UnknownSigTarget)?;
            let info = match self.address_info(addr) {
                Ok(info) => info,
                Err(ClientError::NotFound) => return Err(ClientError::UnknownSigTarget),
                Err(err) => return Err(err),
            };
            txn.sign(slot, &self.seed.key_at(info.key_index))?;
        }
        Ok(())
    }

    fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>> {
        self.get("/utxos")
    }

    fn unlock_conditions(&self, addr: Address) -> Result<UnlockConditions> {
        Ok(self.address_info(addr)?.unlock_conditions)
    }

    fn unconfirmed_parents(&self, txn: &Transaction) -> Result<Vec<Transaction>> {
        Ok(Self::check(
            self.client
                .post(self.url("/unconfirmedparents"))
                .json(txn)
                .send()?,
        )?
        .json()?)
    }
}

impl TransactionPool for WalletClient {
    type Error = ClientError;

    fn accept_transaction_set(&self, txns: &[Transaction]) -> Result<()> {
        if txns.is_empty() {
            return Err(ClientError::EmptyTransactionSet);
        }
        Self::check(
            self.client
                .post(self.url("/broadcast"))
                .json(&txns)
                .send()?,
        )?;
        Ok(())
    }

    /// The wallet server publishes one recommended fee; the maximum is
    /// conventionally three times that.
    fn fee_estimate(&self) -> Result<(Currency, Currency)> {
        let fee: Currency = self.get("/fee")?;
        let max = Currency::new(fee.value().saturating_mul(3));
        Ok((fee, max))
    }
}
