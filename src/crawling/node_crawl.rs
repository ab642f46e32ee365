//! Crawl for the nodes closest to a target.

use std::sync::Arc;

use super::spider::{crawl, Crawl, CrawlState, FindRequest, Responses, SpiderCrawl};
use super::RpcFindResponse;
use crate::common::{Id, Node};
use crate::rpc::{Config, CrawlRpc};

/// Find the `k` nodes closest to a target, sending find_node requests.
///
/// Used for routing table maintenance and as the first half of storing a value.
#[derive(Debug)]
pub struct NodeCrawl<R> {
    spider: SpiderCrawl<R>,
}

impl<R: CrawlRpc> NodeCrawl<R> {
    pub fn new<I: IntoIterator<Item = Node>>(
        rpc: Arc<R>,
        target: Id,
        seeds: I,
        config: &Config,
    ) -> Self {
        Self {
            spider: SpiderCrawl::new(rpc, target, seeds, config),
        }
    }

    /// Crawl until converged, returning the closest responding nodes, closest first.
    pub async fn find(&mut self) -> Vec<Node> {
        crawl(self).await
    }
}

impl<R: CrawlRpc> Crawl<R> for NodeCrawl<R> {
    type Output = Vec<Node>;

    const REQUEST: FindRequest = FindRequest::FindNode;

    fn spider(&self) -> &SpiderCrawl<R> {
        &self.spider
    }

    fn spider_mut(&mut self) -> &mut SpiderCrawl<R> {
        &mut self.spider
    }

    fn nodes_found(&mut self, responses: Responses) -> CrawlState<Vec<Node>> {
        let mut dead = Vec::new();

        for (id, response) in responses {
            match response {
                RpcFindResponse::Failure => dead.push(id),
                RpcFindResponse::Nodes(nodes) => self.spider.merge(&nodes),
                // Nodes answering find_node with a value tell us nothing.
                RpcFindResponse::Value(_) => {}
            }
        }

        for id in dead {
            self.spider.remove_dead(id);
        }

        if self.spider.converged() {
            CrawlState::Done(self.exhausted())
        } else {
            CrawlState::Running
        }
    }

    fn exhausted(&mut self) -> Vec<Node> {
        self.spider.nearest().nodes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::crawling::testing::{node, MockRpc, Reply};

    fn nodes_payload(nodes: &[&Node]) -> Reply {
        Reply::Payload(nodes.iter().map(|n| n.to_bytes()).collect())
    }

    #[test]
    fn nodes_found() {
        let (node1, node2, node3) = (node("id1"), node("id2"), node("id3"));
        let rpc = MockRpc::new();

        let target = Id::digest("s");
        let seeds = vec![node1.clone(), node2.clone(), node3.clone()];
        let mut crawl = NodeCrawl::new(rpc.arc(), target, seeds, &Config::default());

        let response = RpcFindResponse::new(
            true,
            vec![node1.to_bytes(), node2.to_bytes(), node3.to_bytes()],
        );

        // Nothing contacted yet, so keep going.
        let state = crawl.nodes_found(vec![(node1.id, response.clone())]);
        assert_eq!(state, CrawlState::Running);

        for id in [node1.id, node2.id, node3.id] {
            crawl.spider.nearest_mut().mark_contacted(&id);
        }

        let nodes = match crawl.nodes_found(vec![(node1.id, response)]) {
            CrawlState::Done(nodes) => nodes,
            CrawlState::Running => panic!("expected the crawl to be done"),
        };
        assert!(nodes.contains(&node1));
        assert!(nodes.contains(&node2));
        assert!(nodes.contains(&node3));

        let nodes = match crawl.nodes_found(vec![(node1.id, RpcFindResponse::Failure)]) {
            CrawlState::Done(nodes) => nodes,
            CrawlState::Running => panic!("expected the crawl to be done"),
        };
        assert_eq!(nodes.len(), 2);
        assert!(nodes.contains(&node2));
        assert!(nodes.contains(&node3));
    }

    #[test]
    fn dead_node_is_removed_even_if_contacted() {
        let (node1, node2) = (node("id1"), node("id2"));
        let rpc = MockRpc::new();

        let mut crawl = NodeCrawl::new(
            rpc.arc(),
            Id::digest("s"),
            vec![node1.clone(), node2.clone()],
            &Config::default(),
        );
        crawl.spider.nearest_mut().mark_contacted(&node1.id);

        let _ = crawl.nodes_found(vec![(node1.id, RpcFindResponse::Failure)]);

        assert!(!crawl.spider().nearest().contains(&node1.id));
        assert!(!crawl
            .spider()
            .nearest()
            .uncontacted()
            .any(|n| n.id == node1.id));

        // Other nodes still pointing at it do not bring it back.
        let _ = crawl.nodes_found(vec![(
            node2.id,
            RpcFindResponse::new(true, vec![node1.to_bytes()]),
        )]);
        assert!(!crawl.spider().nearest().contains(&node1.id));
    }

    #[tokio::test]
    async fn find_sends_one_request_per_node() {
        let (node1, node2, node3) = (node("id1"), node("id2"), node("id3"));
        let rpc = MockRpc::new()
            .reply(&node1, nodes_payload(&[&node2, &node3]))
            .reply(&node2, nodes_payload(&[&node1, &node3]))
            .reply(&node3, nodes_payload(&[&node1, &node2]));

        let mut crawl = NodeCrawl::new(
            rpc.arc(),
            Id::digest("s"),
            vec![node1.clone(), node2.clone(), node3.clone()],
            &Config::default(),
        );

        let nodes = crawl.find().await;

        assert_eq!(nodes.len(), 3);
        for n in [&node1, &node2, &node3] {
            assert_eq!(nodes.iter().filter(|found| found.id == n.id).count(), 1);
        }
        assert_eq!(rpc.calls().len(), 3);
        assert_eq!(crawl.spider().visited(), 3);
    }

    #[tokio::test]
    async fn find_discovers_closer_nodes() {
        let target = Id::digest("target");

        let mut nodes: Vec<Node> = (0..12).map(|i| node(&format!("node{i}"))).collect();
        nodes.sort_by_key(|n| n.id.xor(&target));

        let closest = nodes[0].clone();
        let far = nodes[11].clone();

        // The farthest node is the only seed and knows the closest one.
        let rpc = MockRpc::new()
            .reply(&far, nodes_payload(&[&nodes[5], &nodes[6]]))
            .reply(&nodes[5], nodes_payload(&[&closest]))
            .reply(&nodes[6], nodes_payload(&[]))
            .reply(&closest, nodes_payload(&[&nodes[1], &nodes[2]]))
            .reply(&nodes[1], nodes_payload(&[]))
            .reply(&nodes[2], nodes_payload(&[]));

        let seeds = vec![far.clone()];
        let mut crawl = NodeCrawl::new(rpc.arc(), target, seeds, &Config::default());
        let found = crawl.find().await;

        let ids: Vec<Id> = found.iter().map(|n| n.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_by_key(|id| id.xor(&target));

        assert_eq!(ids, sorted);
        assert_eq!(ids[0], closest.id);
        assert_eq!(found.len(), 6);
    }

    #[tokio::test]
    async fn unreachable_nodes_are_dropped() {
        let (node1, node2, node3) = (node("id1"), node("id2"), node("id3"));
        let rpc = MockRpc::new()
            .reply(&node1, nodes_payload(&[&node2]))
            .reply(&node2, Reply::Fail)
            .reply(&node3, Reply::Hang);

        let config = Config::default().with_request_timeout(Duration::from_millis(50));
        let mut crawl = NodeCrawl::new(
            rpc.arc(),
            Id::digest("s"),
            vec![node1.clone(), node2, node3],
            &config,
        );

        let nodes = crawl.find().await;

        assert_eq!(nodes, vec![node1]);
    }

    #[tokio::test]
    async fn no_seeds() {
        let rpc = MockRpc::new();
        let mut crawl = NodeCrawl::new(rpc.arc(), Id::random(), vec![], &Config::default());

        assert!(crawl.find().await.is_empty());
        assert!(rpc.calls().is_empty());
    }

    #[test]
    fn alpha_bounds_each_batch() {
        let target = Id::digest("target");
        let seeds: Vec<Node> = (0..6).map(|i| node(&format!("seed{i}"))).collect();

        let config = Config::default().with_alpha(2);
        let mut crawl = NodeCrawl::new(MockRpc::new().arc(), target, seeds.clone(), &config);

        let mut sorted = seeds;
        sorted.sort_by_key(|n| n.id.xor(&target));

        assert_eq!(crawl.spider.next_batch(), sorted[..2].to_vec());
        assert_eq!(crawl.spider.next_batch(), sorted[2..4].to_vec());
        assert_eq!(crawl.spider().visited(), 4);
    }

    #[tokio::test]
    async fn stops_when_first_batch_finds_nothing_closer() {
        let seeds: Vec<Node> = (0..10).map(|i| node(&format!("seed{i}"))).collect();

        let mut rpc = MockRpc::new();
        for seed in &seeds {
            rpc = rpc.reply(seed, nodes_payload(&[]));
        }

        let config = Config::default().with_alpha(3);
        let mut crawl = NodeCrawl::new(rpc.arc(), Id::digest("target"), seeds, &config);

        let batch = crawl.spider.next_batch();
        assert_eq!(batch.len(), 3);

        let responses = crawl.spider().query(batch, FindRequest::FindNode).await;
        let nodes = match crawl.nodes_found(responses) {
            CrawlState::Done(nodes) => nodes,
            CrawlState::Running => panic!("expected the crawl to be done"),
        };

        assert_eq!(nodes.len(), 10);
        assert_eq!(rpc.calls().len(), 3);
    }

    #[tokio::test]
    async fn find_sends_alpha_requests_when_nothing_closer() {
        let seeds: Vec<Node> = (0..10).map(|i| node(&format!("seed{i}"))).collect();

        let mut rpc = MockRpc::new();
        for seed in &seeds {
            rpc = rpc.reply(seed, nodes_payload(&[]));
        }

        let mut crawl = NodeCrawl::new(rpc.arc(), Id::digest("target"), seeds, &Config::default());

        assert_eq!(crawl.find().await.len(), 10);
        assert_eq!(rpc.calls().len(), 3);
        assert_eq!(crawl.spider().visited(), 3);
    }
}
