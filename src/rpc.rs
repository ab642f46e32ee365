//! Remote procedure calls a crawl sends to other nodes.

mod config;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::common::{Id, Node};
use crate::Result;

pub use config::Config;

/// Default request timeout before abandoning an inflight request to a non-responding node.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000); // 2 seconds
/// Default number of requests a crawl keeps inflight at once (alpha).
pub const DEFAULT_ALPHA: usize = 3;

/// Client side of the find_node, find_value and store RPCs.
///
/// Successful find calls resolve to the raw response payload: either a list
/// of serialized [Node] records, or the [VALUE_MARKER](crate::crawling::VALUE_MARKER)
/// followed by the value. Implementations need not enforce timeouts, crawls
/// bound every call with [Config::request_timeout].
#[async_trait]
pub trait CrawlRpc: Send + Sync + 'static {
    /// Ask `peer` for the nodes it knows closest to `target`.
    async fn find_node(&self, peer: &Node, target: Id) -> Result<Vec<Bytes>>;

    /// Ask `peer` for the value stored under `key`, or the nodes closest to it.
    async fn find_value(&self, peer: &Node, key: Id) -> Result<Vec<Bytes>>;

    /// Ask `peer` to store `value` under `key`.
    async fn store(&self, peer: &Node, key: Id, value: Vec<Bytes>) -> Result<()>;
}
