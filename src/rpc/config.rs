use std::time::Duration;

use crate::common::MAX_BUCKET_SIZE_K;

use super::{DEFAULT_ALPHA, DEFAULT_REQUEST_TIMEOUT};

#[derive(Debug, Clone)]
/// Crawl Configurations
pub struct Config {
    /// How many closest nodes a crawl keeps track of and returns.
    ///
    /// Defaults to [MAX_BUCKET_SIZE_K]
    pub k: usize,
    /// How many requests a crawl sends concurrently in each iteration.
    ///
    /// Defaults to [DEFAULT_ALPHA]
    pub alpha: usize,
    /// Request timeout duration.
    ///
    /// The longer this duration is, the longer crawls take until they are deemeed "done".
    /// The shorter this duration is, the more responses from busy nodes we miss out on,
    /// which affects the accuracy of crawls trying to find closest nodes to a target.
    ///
    /// Defaults to [DEFAULT_REQUEST_TIMEOUT]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: MAX_BUCKET_SIZE_K,
            alpha: DEFAULT_ALPHA,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    /// Set `k`, clamped to at least 1.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    /// Set `alpha`, clamped to at least 1.
    pub fn with_alpha(mut self, alpha: usize) -> Self {
        self.alpha = alpha.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}
