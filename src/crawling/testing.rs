//! Scripted [CrawlRpc] for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::{Id, Node};
use crate::rpc::CrawlRpc;
use crate::{Error, Result};

/// A node with an id and key digested from `name`.
pub(crate) fn node(name: &str) -> Node {
    let id = Id::digest(name);
    let port = u16::from_be_bytes([id.as_bytes()[0], id.as_bytes()[1]]);

    Node::new(id, ([127, 0, 0, 1], port).into())
        .with_public_key(Id::digest(format!("key-{name}")).to_vec(), true)
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Respond with this payload to find requests.
    Payload(Vec<Bytes>),
    /// Fail right away.
    Fail,
    /// Never respond.
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    FindNode(Id),
    FindValue(Id),
    Store(Id, Vec<Bytes>),
}

#[derive(Debug, Clone)]
pub(crate) struct MockRpc {
    replies: HashMap<Id, Reply>,
    fail_stores: bool,
    calls: Arc<Mutex<Vec<Call>>>,
    stored_tx: flume::Sender<(Id, Vec<Bytes>)>,
    stored_rx: flume::Receiver<(Id, Vec<Bytes>)>,
}

impl MockRpc {
    pub(crate) fn new() -> Self {
        let (stored_tx, stored_rx) = flume::unbounded();

        Self {
            replies: HashMap::new(),
            fail_stores: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            stored_tx,
            stored_rx,
        }
    }

    pub(crate) fn reply(mut self, node: &Node, reply: Reply) -> Self {
        self.replies.insert(node.id, reply);
        self
    }

    pub(crate) fn fail_stores(mut self) -> Self {
        self.fail_stores = true;
        self
    }

    pub(crate) fn arc(&self) -> Arc<Self> {
        Arc::new(self.clone())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Every store request, as `(peer, value)`, once it was sent.
    pub(crate) fn stored(&self) -> flume::Receiver<(Id, Vec<Bytes>)> {
        self.stored_rx.clone()
    }

    async fn respond(&self, peer: &Node) -> Result<Vec<Bytes>> {
        match self.replies.get(&peer.id) {
            Some(Reply::Payload(payload)) => Ok(payload.clone()),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail) | None => Err(Error::Rpc("unreachable".to_string())),
        }
    }
}

#[async_trait]
impl CrawlRpc for MockRpc {
    async fn find_node(&self, peer: &Node, _target: Id) -> Result<Vec<Bytes>> {
        self.calls.lock().unwrap().push(Call::FindNode(peer.id));
        self.respond(peer).await
    }

    async fn find_value(&self, peer: &Node, _key: Id) -> Result<Vec<Bytes>> {
        self.calls.lock().unwrap().push(Call::FindValue(peer.id));
        self.respond(peer).await
    }

    async fn store(&self, peer: &Node, _key: Id, value: Vec<Bytes>) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Store(peer.id, value.clone()));
        let _ = self.stored_tx.send((peer.id, value));

        if self.fail_stores {
            Err(Error::Rpc("store rejected".to_string()))
        } else {
            Ok(())
        }
    }
}
