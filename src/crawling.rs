//! Iterative crawls that converge on the nodes closest to a target, or on a value.
//!
//! Both [NodeCrawl] and [ValueCrawl] run the same loop over a [SpiderCrawl]:
//! send up to `alpha` concurrent requests to the closest uncontacted nodes,
//! fold the decoded [RpcFindResponse]s into the candidate set, and repeat until
//! no closer nodes turn up (or, for values, until a value is found).

mod node_crawl;
mod response;
mod spider;
#[cfg(test)]
pub(crate) mod testing;
mod value_crawl;

pub use node_crawl::NodeCrawl;
pub use response::{RpcFindResponse, VALUE_MARKER};
pub use spider::{crawl, Crawl, CrawlState, FindRequest, Responses, SpiderCrawl};
pub use value_crawl::ValueCrawl;
