//! The fetch contract the sweep controller drives.

use async_trait::async_trait;
use harvester_core::{Direction, Record, ScanKey};

/// Outcome of one page request.
///
/// Rate limiting is kept apart from other HTTP errors: it is the expected
/// way a long run ends, while other statuses point at a real problem.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    /// The page's rows; empty means the sweep ran past the last page
    Rows(Vec<Record>),
    /// The server signalled a rate limit or ban
    RateLimited,
    /// Any other non-success response
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body, for the operator
        body: String,
    },
    /// Connection, timeout or body decoding failure
    TransportFault(String),
}

/// One page request against the listing API.
///
/// Implementations must not retry internally; the controller checkpoints
/// and stops on every fault.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `page` (1-based) of `key`'s listing in `direction`.
    async fn fetch(&self, key: &ScanKey, direction: Direction, page: u32) -> PageResult;
}
