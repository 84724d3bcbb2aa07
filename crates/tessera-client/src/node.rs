//! Client for a remote full-node daemon.
//!
//! The node serves every capability over one JSON HTTP API: chain state,
//! wallet custody (the node holds the keys and signs), the transaction
//! pool, and the host directory.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use tessera_proto::{TransactionPool, Wallet};
use tessera_renter::hosts::HostKeyResolver;
use tessera_types::{
    Address, BlockHeight, Currency, Hash, HostPublicKey, Transaction, UnlockConditions,
    UnspentOutput,
};

use crate::{ChainClient, ClientError, Result};

/// A client for a running node daemon's HTTP API.
pub struct NodeClient {
    base: String,
    password: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct ChainInfo {
    height: BlockHeight,
    synced: bool,
}

#[derive(Deserialize)]
struct AddressResponse {
    address: Address,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    transaction: &'a Transaction,
    to_sign: Vec<String>,
}

#[derive(Deserialize)]
struct SignResponse {
    transaction: Transaction,
}

#[derive(Deserialize)]
struct FeeEstimate {
    minimum: Currency,
    maximum: Currency,
}

#[derive(Deserialize)]
struct HostDbEntry {
    public_key: HostPublicKey,
    #[serde(default)]
    net_address: String,
}

impl NodeClient {
    /// A client for the daemon at `base`, e.g. `http://localhost:9980`.
    pub fn new(base: impl Into<String>, password: Option<String>) -> Self {
        Self {
            base: base.into(),
            password,
            client: Client::new(),
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
        let message = resp.text().unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        let mut req = self.client.get(self.url(route));
        if let Some(password) = &self.password {
            req = req.basic_auth("", Some(password));
        }
        Ok(Self::check(req.send()?)?.json()?)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, route: &str, body: &B) -> Result<T> {
        let mut req = self.client.post(self.url(route)).json(body);
        if let Some(password) = &self.password {
            req = req.basic_auth("", Some(password));
        }
        Ok(Self::check(req.send()?)?.json()?)
    }
}

impl ChainClient for NodeClient {
    type Error = ClientError;

    fn chain_height(&self) -> Result<BlockHeight> {
        Ok(self.get::<ChainInfo>("/chain")?.height)
    }

    fn synced(&self) -> Result<bool> {
        Ok(self.get::<ChainInfo>("/chain")?.synced)
    }
}

impl Wallet for NodeClient {
    type Error = ClientError;

    fn new_address(&self) -> Result<Address> {
        let resp: AddressResponse = self.post("/wallet/addresses", &())?;
        Ok(resp.address)
    }

    fn sign_transaction(&self, txn: &mut Transaction, to_sign: &[Hash]) -> Result<()> {
        let req = SignRequest {
            transaction: txn,
            to_sign: to_sign.iter().map(hex::encode).collect(),
        };
        let resp: SignResponse = self.post("/wallet/sign", &req)?;
        *txn = resp.transaction;
        Ok(())
    }

    fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>> {
        self.get("/wallet/outputs")
    }

    fn unlock_conditions(&self, addr: Address) -> Result<UnlockConditions> {
        self.get(&format!("/wallet/conditions/{addr}"))
    }

    /// The node's API cannot enumerate mempool parents; this always
    /// returns an empty list and callers must tolerate that.
    fn unconfirmed_parents(&self, _txn: &Transaction) -> Result<Vec<Transaction>> {
        Ok(Vec::new())
    }
}

impl TransactionPool for NodeClient {
    type Error = ClientError;

    fn accept_transaction_set(&self, txns: &[Transaction]) -> Result<()> {
        if txns.is_empty() {
            return Err(ClientError::EmptyTransactionSet);
        }
        let _: serde_json::Value = self.post("/tpool/transactions", &txns)?;
        Ok(())
    }

    fn fee_estimate(&self) -> Result<(Currency, Currency)> {
        let fee: FeeEstimate = self.get("/tpool/fee")?;
        Ok((fee.minimum, fee.maximum))
    }
}

impl HostKeyResolver for NodeClient {
    type Error = ClientError;

    fn lookup_host(&self, prefix: &str) -> Result<HostPublicKey> {
        let hosts: Vec<HostDbEntry> = self.get("/hostdb/hosts")?;
        let mut found: Option<HostPublicKey> = None;
        for entry in hosts {
            if entry.public_key.matches_prefix(prefix) {
                if found.is_some() {
                    return Err(ClientError::Ambiguous);
                }
                found = Some(entry.public_key);
            }
        }
        found.ok_or(ClientError::NotFound)
    }

    fn resolve_host_key(&self, host: &HostPublicKey) -> Result<String> {
        match self.get::<HostDbEntry>(&format!("/hostdb/host/{host}")) {
            Ok(entry) => Ok(entry.net_address),
            Err(ClientError::Status { status: 404, .. }) => Err(ClientError::NoHostAnnouncement),
            Err(err) => Err(err),
        }
    }
}
