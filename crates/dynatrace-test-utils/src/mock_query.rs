//! Mock implementation of the `QueryService` trait for testing.
//!
//! Replays queued submit and poll responses in order and records every call.

use async_trait::async_trait;
use dynatrace_grail::{
    ExecuteRequest, GrailError, GrailResult, PollResponse, PollState, QueryService, SubmitResponse,
};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

struct MockQueryServiceInner {
    /// Responses returned by `submit`, front first.
    submit_responses: VecDeque<SubmitResponse>,
    /// Responses returned by `poll`, front first.
    poll_responses: VecDeque<PollResponse>,
    /// Every request passed to `submit`.
    submitted: Vec<ExecuteRequest>,
    /// Every token passed to `poll`.
    polled_tokens: Vec<String>,
    /// When set, every call fails with this HTTP status.
    fail_status: Option<u16>,
}

/// A mock implementation of the `QueryService` trait for testing.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and all
/// clones share the same state. When the poll queue runs dry, `poll` keeps
/// answering `RUNNING`.
#[derive(Clone)]
pub struct MockQueryService {
    inner: Arc<RwLock<MockQueryServiceInner>>,
}

impl Default for MockQueryService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockQueryService {
    /// Create a mock with no queued responses.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockQueryServiceInner {
                submit_responses: VecDeque::new(),
                poll_responses: VecDeque::new(),
                submitted: Vec::new(),
                polled_tokens: Vec::new(),
                fail_status: None,
            })),
        }
    }

    /// Queue a response for `submit`.
    pub fn with_submit(self, response: SubmitResponse) -> Self {
        self.inner.write().unwrap().submit_responses.push_back(response);
        self
    }

    /// Queue a response for `poll`.
    pub fn with_poll(self, response: PollResponse) -> Self {
        self.inner.write().unwrap().poll_responses.push_back(response);
        self
    }

    /// Configure the mock to fail all calls with the given HTTP status.
    pub fn with_failure(self, status: u16) -> Self {
        self.inner.write().unwrap().fail_status = Some(status);
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_failure(&self, status: Option<u16>) {
        self.inner.write().unwrap().fail_status = status;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Get all submitted requests.
    pub fn submitted(&self) -> Vec<ExecuteRequest> {
        self.inner.read().unwrap().submitted.clone()
    }

    /// Get the number of `submit` calls.
    pub fn submit_count(&self) -> usize {
        self.inner.read().unwrap().submitted.len()
    }

    /// Get all tokens passed to `poll`.
    pub fn polled_tokens(&self) -> Vec<String> {
        self.inner.read().unwrap().polled_tokens.clone()
    }

    /// Get the number of `poll` calls.
    pub fn poll_count(&self) -> usize {
        self.inner.read().unwrap().polled_tokens.len()
    }

    fn check_failure(inner: &MockQueryServiceInner) -> GrailResult<()> {
        match inner.fail_status {
            Some(status) => Err(GrailError::Transport {
                status: Some(status),
                message: "mock failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn submit(&self, request: &ExecuteRequest) -> GrailResult<SubmitResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.submitted.push(request.clone());
        Self::check_failure(&inner)?;

        inner
            .submit_responses
            .pop_front()
            .ok_or_else(|| GrailError::InvalidResponse("no submit response queued".to_string()))
    }

    async fn poll(&self, request_token: &str) -> GrailResult<PollResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.polled_tokens.push(request_token.to_string());
        Self::check_failure(&inner)?;

        Ok(inner.poll_responses.pop_front().unwrap_or(PollResponse {
            state: Some(PollState::Running),
            progress: None,
            result: None,
        }))
    }
}
