#![doc = include_str!("../README.md")]

// Public modules
mod common;
mod crawler;
pub mod crawling;
mod error;
pub mod rpc;

pub use crate::common::{ClosestNodes, Id, Node, ID_SIZE, MAX_BUCKET_SIZE_K};
pub use bytes::Bytes;
pub use crawler::{Crawler, StoreReport};
pub use error::{Error, Result};

pub use ed25519_dalek::SigningKey;
