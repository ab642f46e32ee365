//! High level lookups built on the node and value crawls.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use crate::common::{Id, Node};
use crate::crawling::{NodeCrawl, ValueCrawl};
use crate::rpc::{Config, CrawlRpc};
use crate::Error;

/// Runs crawls against the network reachable through an [CrawlRpc] client.
///
/// Seeds are passed with every call, usually the closest nodes to the target
/// from the caller's routing table.
#[derive(Debug)]
pub struct Crawler<R> {
    rpc: Arc<R>,
    config: Config,
}

impl<R> Clone for Crawler<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: self.rpc.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: CrawlRpc> Crawler<R> {
    pub fn new(rpc: R, config: Config) -> Self {
        Self {
            rpc: Arc::new(rpc),
            config,
        }
    }

    // === Getters ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    // === Public Methods ===

    /// Find the closest nodes to `target` that responded, closest first.
    pub async fn find_node(&self, target: Id, seeds: Vec<Node>) -> Vec<Node> {
        NodeCrawl::new(self.rpc.clone(), target, seeds, &self.config)
            .find()
            .await
    }

    /// Find the value stored under `key`.
    ///
    /// Must be called within a tokio runtime, a found value is stored back at
    /// the nearest node that lacked it in the background.
    pub async fn find_value(&self, key: Id, seeds: Vec<Node>) -> Option<Vec<Bytes>> {
        ValueCrawl::new(self.rpc.clone(), key, seeds, &self.config)
            .find()
            .await
    }

    /// Find the closest nodes to `key` then ask all of them to store `value`.
    ///
    /// Returns which of the closest nodes confirmed storing it.
    pub async fn store(&self, key: Id, value: Vec<Bytes>, seeds: Vec<Node>) -> StoreReport {
        let closest_nodes = self.find_node(key, seeds).await;
        let stored_at = self.store_at(key, &value, &closest_nodes).await;

        info!(
            ?key,
            closest_nodes = closest_nodes.len(),
            stored_at = stored_at.len(),
            "Store query done"
        );

        StoreReport::new(key, closest_nodes, stored_at)
    }

    /// Ask every node in `nodes` to store `value` concurrently, skipping the
    /// lookup. Returns the ids of those that confirmed.
    pub async fn store_at(&self, key: Id, value: &[Bytes], nodes: &[Node]) -> Vec<Id> {
        let rpc = &*self.rpc;
        let request_timeout = self.config.request_timeout;

        let mut inflight: FuturesUnordered<_> = nodes
            .iter()
            .map(move |node| async move {
                let result = tokio::time::timeout(
                    request_timeout,
                    rpc.store(node, key, value.to_vec()),
                )
                .await
                .unwrap_or(Err(Error::Timeout));

                (node.id, result)
            })
            .collect();

        let mut stored_at = Vec::with_capacity(inflight.len());

        while let Some((id, result)) = inflight.next().await {
            match result {
                Ok(()) => stored_at.push(id),
                Err(error) => debug!(?key, node = ?id, ?error, "Store request failed"),
            }
        }

        stored_at
    }
}

/// Outcome of [Crawler::store].
#[derive(Clone, Debug)]
pub struct StoreReport {
    target: Id,
    stored_at: Vec<Id>,
    closest_nodes: Vec<Node>,
}

impl StoreReport {
    pub fn new(target: Id, closest_nodes: Vec<Node>, stored_at: Vec<Id>) -> Self {
        Self {
            target,
            closest_nodes,
            stored_at,
        }
    }

    /// Return the key the value was stored under.
    pub fn target(&self) -> Id {
        self.target
    }

    /// Return the set of nodes that confirmed storing the value, closest first.
    pub fn stored_at(&self) -> Vec<&Node> {
        self.closest_nodes
            .iter()
            .filter(|node| self.stored_at.contains(&node.id))
            .collect()
    }

    /// Return closest nodes. Useful to repeat the store operation without repeating the lookup.
    pub fn closest_nodes(&self) -> &[Node] {
        &self.closest_nodes
    }
}
