//! Main Crate Error

#[derive(thiserror::Error, Debug)]
/// Crawl crate error enum.
pub enum Error {
    #[error("Failed to parse node record bytes: {0}")]
    BencodeError(#[from] serde_bencode::Error),

    /// Id bytes were not exactly [ID_SIZE](crate::common::ID_SIZE) long.
    #[error("Invalid Id size, expected 20, got {0}")]
    InvalidIdSize(usize),

    /// Id string was not valid hex.
    #[error("Invalid Id hex string")]
    InvalidIdHex,

    /// A node record decoded fine but carried an invalid field.
    #[error("Invalid node record: {0}")]
    InvalidNodeRecord(&'static str),

    /// Remote peer did not answer within the configured request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Transport level failure reported by the RPC layer.
    #[error("Rpc error: {0}")]
    Rpc(String),
}

/// Alias for `Result<T, Error>`.
pub type Result<T, E = Error> = core::result::Result<T, E>;
