//! Client for the host announcement server.
//!
//! The announcement server is the lightweight half of the split
//! deployment: it serves chain height, sync state, and signed host
//! announcements looked up by key prefix. Announcements are verified
//! against the key they embed before anything is trusted.
//!
//! Routes: `GET /height`, `GET /synced`, `GET /host/<prefix>`
//! (204 = not found, 410 = ambiguous prefix).

use reqwest::blocking::Client;

use tessera_crypto::ed25519::Signature;
use tessera_renter::hosts::HostKeyResolver;
use tessera_types::{BlockHeight, HostAnnouncement, HostPublicKey};
use tessera_wire::{from_bytes, Decoder};

use crate::{ChainClient, ClientError, Result};

/// A client for an announcement server.
pub struct AnnounceClient {
    base: String,
    client: Client,
}

impl AnnounceClient {
    /// A client for the announcement server at `base`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            client: Client::new(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base, route)
    }

    /// Fetch and verify the announcement behind `/host/<selector>`.
    fn fetch_announcement(&self, selector: &str) -> Result<HostAnnouncement> {
        let resp = self.client.get(self.url(&format!("/host/{selector}"))).send()?;
        match resp.status().as_u16() {
            204 => return Err(ClientError::NotFound),
            410 => return Err(ClientError::Ambiguous),
            code if !(200..300).contains(&code) => {
                return Err(ClientError::Status {
                    status: code,
                    message: resp.text().unwrap_or_default(),
                })
            }
            _ => {}
        }
        parse_signed_announcement(&resp.bytes()?)
    }
}

/// Parse `[len:u64][announcement][signature:64]`, verifying the signature
/// over the announcement bytes with the key the announcement embeds.
fn parse_signed_announcement(bytes: &[u8]) -> Result<HostAnnouncement> {
    let mut dec = Decoder::new(bytes);
    let body = dec.read_prefixed()?;
    let sig_bytes: [u8; 64] = dec.read_array()?;
    dec.finish()?;

    let announcement: HostAnnouncement = from_bytes(body)?;
    let key = announcement.public_key.verifying_key()?;
    key.verify(body, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| ClientError::SignatureInvalid)?;
    Ok(announcement)
}

impl ChainClient for AnnounceClient {
    type Error = ClientError;

    fn chain_height(&self) -> Result<BlockHeight> {
        let resp = self.client.get(self.url("/height")).send()?;
        let text = resp.text()?;
        text.trim()
            .parse()
            .map_err(|_| ClientError::Malformed(format!("height '{text}'")))
    }

    fn synced(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/synced")).send()?;
        let text = resp.text()?;
        text.trim()
            .parse()
            .map_err(|_| ClientError::Malformed(format!("synced '{text}'")))
    }
}

impl HostKeyResolver for AnnounceClient {
    type Error = ClientError;

    fn lookup_host(&self, prefix: &str) -> Result<HostPublicKey> {
        let announcement = self.fetch_announcement(prefix)?;
        if !announcement.public_key.matches_prefix(prefix) {
            return Err(ClientError::Malformed(
                "announcement does not match requested prefix".into(),
            ));
        }
        Ok(announcement.public_key)
    }

    fn resolve_host_key(&self, host: &HostPublicKey) -> Result<String> {
        let announcement = match self.fetch_announcement(&host.to_string()) {
            Ok(announcement) => announcement,
            Err(ClientError::NotFound) => return Err(ClientError::NoHostAnnouncement),
            Err(err) => return Err(err),
        };
        if announcement.public_key != *host {
            return Err(ClientError::Malformed(
                "announcement names a different host".into(),
            ));
        }
        Ok(announcement.net_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use tessera_crypto::ed25519::SigningKey;
    use tessera_wire::frame::write_signed_object;

    fn signed_announcement(key: &SigningKey, net_address: &str) -> (HostPublicKey, Vec<u8>) {
        let public_key = HostPublicKey::from_bytes(key.verifying_key().to_bytes());
        let announcement = HostAnnouncement {
            net_address: net_address.into(),
            public_key,
        };
        let mut bytes = Vec::new();
        write_signed_object(&mut bytes, &announcement, key).expect("sign");
        (public_key, bytes)
    }

    #[test]
    fn test_height_and_synced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(200).body("41500");
        });
        server.mock(|when, then| {
            when.method(GET).path("/synced");
            then.status(200).body("true");
        });

        let client = AnnounceClient::new(server.base_url());
        assert_eq!(client.chain_height().expect("height"), 41500);
        assert!(client.synced().expect("synced"));
    }

    #[test]
    fn test_resolve_verifies_signature() {
        let server = MockServer::start();
        let host_key = SigningKey::generate();
        let (public_key, bytes) = signed_announcement(&host_key, "host.example:9982");
        server.mock(|when, then| {
            when.method(GET).path(format!("/host/{public_key}"));
            then.status(200).body(bytes);
        });

        let client = AnnounceClient::new(server.base_url());
        assert_eq!(
            client.resolve_host_key(&public_key).expect("resolve"),
            "host.example:9982"
        );
    }

    #[test]
    fn test_tampered_announcement_rejected() {
        let server = MockServer::start();
        let host_key = SigningKey::generate();
        let (public_key, mut bytes) = signed_announcement(&host_key, "host.example:9982");
        // Flip a byte inside the announcement body.
        bytes[10] ^= 0x01;
        server.mock(|when, then| {
            when.method(GET).path(format!("/host/{public_key}"));
            then.status(200).body(bytes);
        });

        let client = AnnounceClient::new(server.base_url());
        assert!(client.resolve_host_key(&public_key).is_err());
    }

    #[test]
    fn test_missing_announcement() {
        let server = MockServer::start();
        let key = HostPublicKey::from_bytes([0x77; 32]);
        server.mock(|when, then| {
            when.method(GET).path(format!("/host/{key}"));
            then.status(204);
        });

        let client = AnnounceClient::new(server.base_url());
        assert!(matches!(
            client.resolve_host_key(&key),
            Err(ClientError::NoHostAnnouncement)
        ));
    }

    #[test]
    fn test_ambiguous_prefix() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/host/ab");
            then.status(410);
        });

        let client = AnnounceClient::new(server.base_url());
        assert!(matches!(
            client.lookup_host("ab"),
            Err(ClientError::Ambiguous)
        ));
    }

    #[test]
    fn test_lookup_returns_matching_key() {
        let server = MockServer::start();
        let host_key = SigningKey::generate();
        let (public_key, bytes) = signed_announcement(&host_key, "host.example:9982");
        let prefix = &public_key.to_string()[..12];
        server.mock(|when, then| {
            when.method(GET).path(format!("/host/{prefix}"));
            then.status(200).body(bytes);
        });

        let client = AnnounceClient::new(server.base_url());
        assert_eq!(client.lookup_host(prefix).expect("lookup"), public_key);
    }
}
