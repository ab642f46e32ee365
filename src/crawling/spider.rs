//! State and main loop shared by node and value crawls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace};

use super::RpcFindResponse;
use crate::common::{ClosestNodes, Id, Node};
use crate::rpc::{Config, CrawlRpc};
use crate::Error;

/// Responses of one batch as `(responder id, response)`, in completion order.
pub type Responses = Vec<(Id, RpcFindResponse)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The request a crawl sends to each node it visits.
pub enum FindRequest {
    FindNode,
    FindValue,
}

#[derive(Debug, Clone, PartialEq)]
/// Whether a crawl needs another iteration, or is done with a result.
pub enum CrawlState<T> {
    Running,
    Done(T),
}

/// An iterative process of concurrently sending a request to the closest known nodes to
/// the target, merging closer nodes discovered in the responses, and
/// repeating this process until no closer nodes (that aren't already queried) are found.
#[derive(Debug)]
pub struct SpiderCrawl<R> {
    rpc: Arc<R>,
    target: Id,
    nearest: ClosestNodes,
    /// Nodes that failed to respond, never added back as candidates.
    dead: HashSet<Id>,
    alpha: usize,
    request_timeout: Duration,
    /// Distance of the closest node when the current batch was sent.
    closest_before: Option<Id>,
    visited: usize,
}

impl<R: CrawlRpc> SpiderCrawl<R> {
    /// Start a crawl towards `target` from the `seeds` the routing table knows.
    pub fn new<I: IntoIterator<Item = Node>>(
        rpc: Arc<R>,
        target: Id,
        seeds: I,
        config: &Config,
    ) -> Self {
        let mut nearest = ClosestNodes::new(target, config.k);
        nearest.push_all(seeds);

        trace!(?target, seeds = nearest.len(), "New crawl");

        Self {
            rpc,
            target,
            nearest,
            dead: HashSet::new(),
            alpha: config.alpha.max(1),
            request_timeout: config.request_timeout,
            closest_before: None,
            visited: 0,
        }
    }

    // === Getters ===

    pub fn target(&self) -> Id {
        self.target
    }

    /// Closest known nodes to the target so far.
    pub fn nearest(&self) -> &ClosestNodes {
        &self.nearest
    }

    pub fn nearest_mut(&mut self) -> &mut ClosestNodes {
        &mut self.nearest
    }

    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Number of requests sent so far.
    pub fn visited(&self) -> usize {
        self.visited
    }

    // === Public Methods ===

    /// Pick the next nodes to visit and mark them contacted.
    ///
    /// Up to `alpha` closest uncontacted nodes. Empty once every node was contacted.
    pub fn next_batch(&mut self) -> Vec<Node> {
        let batch: Vec<Node> = self
            .nearest
            .uncontacted()
            .take(self.alpha)
            .cloned()
            .collect();

        for node in &batch {
            self.nearest.mark_contacted(&node.id);
        }

        self.closest_before = self.nearest.closest_distance();
        self.visited += batch.len();

        batch
    }

    /// Send `request` to every node in `batch` concurrently and wait for all of them
    /// to respond, fail, or time out.
    pub async fn query(&self, batch: Vec<Node>, request: FindRequest) -> Responses {
        debug!(target = ?self.target, ?request, batch = batch.len(), "Crawl sending batch");

        let rpc = &*self.rpc;
        let target = self.target;
        let request_timeout = self.request_timeout;

        let mut inflight: FuturesUnordered<_> = batch
            .into_iter()
            .map(move |node| async move {
                let call = async {
                    match request {
                        FindRequest::FindNode => rpc.find_node(&node, target).await,
                        FindRequest::FindValue => rpc.find_value(&node, target).await,
                    }
                };

                let result = tokio::time::timeout(request_timeout, call)
                    .await
                    .unwrap_or_else(|_| Err(Error::Timeout));

                if let Err(error) = &result {
                    trace!(node = ?node.id, ?error, "Crawl request failed");
                }

                (node.id, RpcFindResponse::from(result))
            })
            .collect();

        let mut responses = Vec::with_capacity(inflight.len());

        while let Some(response) = inflight.next().await {
            responses.push(response);
        }

        responses
    }

    /// Drop a node that failed to respond, and never consider it again.
    pub fn remove_dead(&mut self, id: Id) {
        self.nearest.remove(&id);
        self.dead.insert(id);
    }

    /// Add nodes from a response as candidates, skipping known dead nodes.
    pub fn merge(&mut self, nodes: &[Node]) {
        for node in nodes {
            if !self.dead.contains(&node.id) {
                self.nearest.push(node.clone());
            }
        }
    }

    /// Decide whether the crawl is done after merging a batch.
    ///
    /// Done once every candidate was contacted, or as soon as an iteration
    /// found no node closer than the closest known before it.
    pub fn converged(&self) -> bool {
        if self.nearest.all_contacted() {
            return true;
        }

        let progressed = match (self.nearest.closest_distance(), self.closest_before) {
            (Some(now), Some(before)) => now < before,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if !progressed {
            trace!(target = ?self.target, "Crawl found nothing closer");
        }

        !progressed
    }
}

/// A crawl strategy driven by [crawl].
pub trait Crawl<R: CrawlRpc> {
    type Output;

    /// The request sent to every visited node.
    const REQUEST: FindRequest;

    fn spider(&self) -> &SpiderCrawl<R>;

    fn spider_mut(&mut self) -> &mut SpiderCrawl<R>;

    /// Merge the responses of one batch and decide whether to continue.
    fn nodes_found(&mut self, responses: Responses) -> CrawlState<Self::Output>;

    /// Result once there is nobody left to ask.
    fn exhausted(&mut self) -> Self::Output;
}

/// Run a crawl until its strategy is done or its candidates are exhausted.
pub async fn crawl<R: CrawlRpc, C: Crawl<R>>(strategy: &mut C) -> C::Output {
    loop {
        let batch = strategy.spider_mut().next_batch();

        let output = if batch.is_empty() {
            strategy.exhausted()
        } else {
            let responses = strategy.spider().query(batch, C::REQUEST).await;

            match strategy.nodes_found(responses) {
                CrawlState::Running => continue,
                CrawlState::Done(output) => output,
            }
        };

        let spider = strategy.spider();
        let closest = spider
            .nearest
            .nodes()
            .first()
            .map(|node| node.id.distance(&spider.target));
        debug!(
            target = ?spider.target,
            request = ?C::REQUEST,
            visited = spider.visited,
            candidates = spider.nearest.len(),
            ?closest,
            "Done crawl"
        );

        return output;
    }
}
