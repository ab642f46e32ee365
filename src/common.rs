//! Miscellaneous common structs used throughout the library.

mod closest_nodes;
mod id;
mod node;

pub use closest_nodes::*;
pub use id::*;
pub use node::*;

/// K: how many closest nodes a crawl tracks, the routing table's bucket size.
pub const MAX_BUCKET_SIZE_K: usize = 20;
