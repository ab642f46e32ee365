//! Crawl for a value stored under a key.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::spider::{crawl, Crawl, CrawlState, FindRequest, Responses, SpiderCrawl};
use super::RpcFindResponse;
use crate::common::{Id, Node};
use crate::rpc::{Config, CrawlRpc};

/// Find the value stored under a key, sending find_value requests.
///
/// Stops at the first batch that returns a value, settles conflicting values by
/// majority, and stores the winner at the first node that answered without it.
#[derive(Debug)]
pub struct ValueCrawl<R> {
    spider: SpiderCrawl<R>,
    /// Set once, by the first node that responded with nodes instead of the value.
    nearest_without_value: Option<Node>,
    /// Every value seen during this crawl, in arrival order.
    found_values: Vec<Vec<Bytes>>,
}

impl<R: CrawlRpc> ValueCrawl<R> {
    pub fn new<I: IntoIterator<Item = Node>>(
        rpc: Arc<R>,
        key: Id,
        seeds: I,
        config: &Config,
    ) -> Self {
        Self {
            spider: SpiderCrawl::new(rpc, key, seeds, config),
            nearest_without_value: None,
            found_values: Vec::new(),
        }
    }

    pub fn nearest_without_value(&self) -> Option<&Node> {
        self.nearest_without_value.as_ref()
    }

    /// Remember a node that lacks the value, unless one is already remembered.
    pub fn set_nearest_without_value(&mut self, node: Node) {
        if self.nearest_without_value.is_none() {
            self.nearest_without_value = Some(node);
        }
    }

    /// Crawl until a value is found, or None if the crawl converged without one.
    pub async fn find(&mut self) -> Option<Vec<Bytes>> {
        crawl(self).await
    }

    /// Settle on the most common of `values` (first seen wins ties) and store it
    /// at the nearest node known to lack it, without waiting for the outcome.
    ///
    /// Must be called within a tokio runtime if a node without the value is known.
    pub fn handle_found_values(&self, values: &[Vec<Bytes>]) -> Option<Vec<Bytes>> {
        let mut counts: Vec<(&Vec<Bytes>, usize)> = Vec::new();

        for value in values {
            match counts.iter_mut().find(|(seen, _)| *seen == value) {
                Some((_, count)) => *count += 1,
                None => counts.push((value, 1)),
            }
        }

        if counts.len() > 1 {
            warn!(
                key = ?self.spider.target(),
                values = counts.len(),
                "Got multiple values for key"
            );
        }

        let mut winner: Option<(&Vec<Bytes>, usize)> = None;
        for (value, count) in counts {
            if winner.map_or(true, |(_, best)| count > best) {
                winner = Some((value, count));
            }
        }
        let value = winner?.0.clone();

        if let Some(peer) = self.nearest_without_value.clone() {
            let rpc = self.spider.rpc().clone();
            let key = self.spider.target();
            let request_timeout = self.spider.request_timeout();
            let stored = value.clone();

            tokio::spawn(async move {
                match tokio::time::timeout(request_timeout, rpc.store(&peer, key, stored)).await {
                    Ok(Ok(())) => {
                        debug!(?key, peer = ?peer.id, "Stored value at node that lacked it")
                    }
                    Ok(Err(error)) => {
                        debug!(?key, peer = ?peer.id, ?error, "Failed to store value")
                    }
                    Err(_) => debug!(?key, peer = ?peer.id, "Store request timed out"),
                }
            });
        }

        Some(value)
    }
}

impl<R: CrawlRpc> Crawl<R> for ValueCrawl<R> {
    type Output = Option<Vec<Bytes>>;

    const REQUEST: FindRequest = FindRequest::FindValue;

    fn spider(&self) -> &SpiderCrawl<R> {
        &self.spider
    }

    fn spider_mut(&mut self) -> &mut SpiderCrawl<R> {
        &mut self.spider
    }

    fn nodes_found(&mut self, responses: Responses) -> CrawlState<Option<Vec<Bytes>>> {
        let mut dead = Vec::new();
        let mut found = false;

        for (id, response) in responses {
            match response {
                RpcFindResponse::Failure => dead.push(id),
                RpcFindResponse::Value(value) => {
                    found = true;
                    self.found_values.push(value);
                }
                RpcFindResponse::Nodes(nodes) => {
                    if let Some(peer) = self.spider.nearest().get(&id).cloned() {
                        self.set_nearest_without_value(peer);
                    }
                    self.spider.merge(&nodes);
                }
            }
        }

        for id in dead {
            self.spider.remove_dead(id);
        }

        if found {
            return CrawlState::Done(self.handle_found_values(&self.found_values));
        }

        if self.spider.converged() {
            CrawlState::Done(None)
        } else {
            CrawlState::Running
        }
    }

    fn exhausted(&mut self) -> Option<Vec<Bytes>> {
        None
    }
}
