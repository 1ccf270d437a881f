//! Seam to the remote query-execution service.

use async_trait::async_trait;

use crate::error::GrailResult;
use crate::types::{ExecuteRequest, PollResponse, SubmitResponse};

/// Remote service that runs DQL queries.
///
/// The HTTP client implements this against the Grail storage API; tests use
/// an in-memory implementation.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submit a query. The response carries either a result or a request token.
    async fn submit(&self, request: &ExecuteRequest) -> GrailResult<SubmitResponse>;

    /// Poll a running query by its request token.
    async fn poll(&self, request_token: &str) -> GrailResult<PollResponse>;
}
