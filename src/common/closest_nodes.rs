use std::collections::HashSet;

use crate::common::{Id, Node};

/// Size capped set of nodes ordered by XOR distance to a target, that also
/// remembers which of them were already contacted during a crawl.
#[derive(Debug, Clone)]
pub struct ClosestNodes {
    target: Id,
    capacity: usize,
    nodes: Vec<Node>,
    contacted: HashSet<Id>,
}

impl ClosestNodes {
    /// Create an empty set keeping at most `capacity` (at least 1) nodes closest to `target`.
    pub fn new(target: Id, capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            target,
            capacity,
            nodes: Vec::with_capacity(capacity + 1),
            contacted: HashSet::new(),
        }
    }

    // === Getters ===

    pub fn target(&self) -> Id {
        self.target
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &Id) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.get(id).is_some()
    }

    /// XOR distance from the target to the closest member.
    pub fn closest_distance(&self) -> Option<Id> {
        self.nodes.first().map(|node| node.id.xor(&self.target))
    }

    /// Members not contacted yet, closest first.
    ///
    /// Evaluated lazily against the current state on every call.
    pub fn uncontacted(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes
            .iter()
            .filter(move |node| !self.contacted.contains(&node.id))
    }

    pub fn all_contacted(&self) -> bool {
        self.uncontacted().next().is_none()
    }

    // === Public Methods ===

    /// Insert a node, ignoring it if a node with the same id is already a member.
    ///
    /// If this grows the set over capacity, the farthest member is dropped,
    /// which is the new node itself if it is the farthest.
    pub fn push(&mut self, node: Node) {
        let seek = node.id.xor(&self.target);

        if let Err(pos) = self.nodes.binary_search_by(|prope| {
            if prope.id == node.id {
                std::cmp::Ordering::Equal
            } else {
                prope.id.xor(&self.target).cmp(&seek)
            }
        }) {
            self.nodes.insert(pos, node);

            if self.nodes.len() > self.capacity {
                self.nodes.pop();
            }
        }
    }

    pub fn push_all<I: IntoIterator<Item = Node>>(&mut self, nodes: I) {
        for node in nodes {
            self.push(node);
        }
    }

    /// Remove a node by id, no-op if it is not a member.
    pub fn remove(&mut self, id: &Id) {
        self.nodes.retain(|node| &node.id != id);
    }

    /// Mark a member as contacted, no-op if it is not a member.
    ///
    /// Contacted ids are remembered even after the node is evicted or removed,
    /// so a crawl never sends a second request to the same node.
    pub fn mark_contacted(&mut self, id: &Id) {
        if self.contains(id) {
            self.contacted.insert(*id);
        }
    }
}
