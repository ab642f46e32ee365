//! Struct and implementation of the Node entry a crawl discovers and contacts.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::common::{id::signed_public_key, Id};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Node record exchanged in find_node and find_value responses.
///
/// Two records are equal only if every field (and so their wire form) is equal,
/// while sets of nodes like [ClosestNodes](crate::common::ClosestNodes) dedup by `id`.
pub struct Node {
    pub id: Id,
    pub address: SocketAddr,
    /// Public key material the [Id] was derived from.
    pub signed_public_key: Bytes,
    /// Long lived nodes are expected to stay online (servers, vendors).
    pub long_lived: bool,
}

/// Bencode layout of a [Node].
#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    #[serde(with = "serde_bytes")]
    id: Vec<u8>,
    #[serde(with = "serde_bytes")]
    ip: Vec<u8>,
    port: u16,
    #[serde(with = "serde_bytes")]
    pubkey: Vec<u8>,
    ll: u8,
}

impl Node {
    /// Creates a new Node from an id and socket address.
    pub fn new(id: Id, address: SocketAddr) -> Node {
        Node {
            id,
            address,
            signed_public_key: Bytes::new(),
            long_lived: false,
        }
    }

    /// Creates a node for a signing key, deriving its [Id] from the signed public key.
    pub fn from_signing_key(
        signing_key: &SigningKey,
        address: SocketAddr,
        long_lived: bool,
    ) -> Node {
        let signed_public_key = signed_public_key(signing_key);

        Node {
            id: Id::digest(&signed_public_key),
            address,
            signed_public_key: signed_public_key.into(),
            long_lived,
        }
    }

    /// Attach public key material and the long lived flag.
    pub fn with_public_key(
        mut self,
        signed_public_key: impl Into<Bytes>,
        long_lived: bool,
    ) -> Self {
        self.signed_public_key = signed_public_key.into();
        self.long_lived = long_lived;
        self
    }

    /// Creates a random node for testing purposes.
    pub fn random() -> Node {
        Node::new(
            Id::random(),
            SocketAddr::new(
                IpAddr::V4(Ipv4Addr::from(rand::random::<u32>())),
                rand::random(),
            ),
        )
    }

    /// Serialize into the wire form carried inside node list payloads.
    pub fn to_bytes(&self) -> Bytes {
        let ip = match self.address.ip() {
            IpAddr::V4(ip) => ip.octets().to_vec(),
            IpAddr::V6(ip) => ip.octets().to_vec(),
        };

        let record = NodeRecord {
            id: self.id.to_vec(),
            ip,
            port: self.address.port(),
            pubkey: self.signed_public_key.to_vec(),
            ll: self.long_lived as u8,
        };

        // A struct of byte strings and integers always serializes.
        serde_bencode::to_bytes(&record)
            .map(Bytes::from)
            .unwrap_or_default()
    }

    /// Parse a node from its wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Node> {
        let record: NodeRecord = serde_bencode::from_bytes(bytes)?;

        let id = Id::from_bytes(&record.id)?;

        let ip = match record.ip.len() {
            4 => {
                let mut octets = [0_u8; 4];
                octets.copy_from_slice(&record.ip);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            16 => {
                let mut octets = [0_u8; 16];
                octets.copy_from_slice(&record.ip);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            _ => return Err(Error::InvalidNodeRecord("ip must be 4 or 16 bytes")),
        };

        let long_lived = match record.ll {
            0 => false,
            1 => true,
            _ => return Err(Error::InvalidNodeRecord("long lived flag must be 0 or 1")),
        };

        Ok(Node {
            id,
            address: SocketAddr::new(ip, record.port),
            signed_public_key: record.pubkey.into(),
            long_lived,
        })
    }
}
