//! Decoded outcome of a single find_node or find_value request.
use bytes::Bytes;
use tracing::trace;

use crate::common::Node;
use crate::Result;

/// First payload element of a find_value response that carries the value
/// instead of a node list. Bencoded node records always start with `d`.
pub const VALUE_MARKER: &[u8] = b"value";

#[derive(Debug, Clone, PartialEq)]
/// Outcome of a find request, decoded once from the raw `(ok, payload)` pair.
pub enum RpcFindResponse {
    /// The request failed or timed out.
    Failure,
    /// The responder had the value, marker stripped.
    Value(Vec<Bytes>),
    /// The responder returned closer nodes, malformed records dropped.
    Nodes(Vec<Node>),
}

impl RpcFindResponse {
    pub fn new(ok: bool, payload: Vec<Bytes>) -> Self {
        if !ok {
            return RpcFindResponse::Failure;
        }

        match payload.split_first() {
            Some((marker, value)) if marker.as_ref() == VALUE_MARKER => {
                RpcFindResponse::Value(value.to_vec())
            }
            _ => RpcFindResponse::Nodes(parse_node_list(&payload)),
        }
    }

    // === Getters ===

    /// Whether the request got any response at all.
    pub fn happened(&self) -> bool {
        !matches!(self, RpcFindResponse::Failure)
    }

    pub fn has_value(&self) -> bool {
        matches!(self, RpcFindResponse::Value(_))
    }

    /// The returned value, if the responder had one.
    pub fn value(&self) -> Option<&[Bytes]> {
        match self {
            RpcFindResponse::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Successfully parsed nodes, in payload order. Empty for failures and values.
    pub fn node_list(&self) -> &[Node] {
        match self {
            RpcFindResponse::Nodes(nodes) => nodes,
            _ => &[],
        }
    }
}

impl From<Result<Vec<Bytes>>> for RpcFindResponse {
    fn from(result: Result<Vec<Bytes>>) -> Self {
        match result {
            Ok(payload) => RpcFindResponse::new(true, payload),
            Err(_) => RpcFindResponse::Failure,
        }
    }
}

fn parse_node_list(payload: &[Bytes]) -> Vec<Node> {
    payload
        .iter()
        .map(|bytes| Node::from_bytes(bytes))
        .filter_map(|result| match result {
            Ok(node) => Some(node),
            Err(error) => {
                trace!(?error, "Dropping malformed node record");
                None
            }
        })
        .collect()
}
