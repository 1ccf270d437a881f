//! Submit-and-poll execution of DQL queries with budget accounting.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::budget::{BudgetLimit, BudgetRegistry};
use crate::error::{GrailError, GrailResult};
use crate::service::QueryService;
use crate::types::{ExecuteRequest, PollState, QueryPayload, QueryResult};

/// Delay between two polls of a running query.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls before giving up on a running query (five minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 150;

/// Poll loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Runs queries against a [`QueryService`] and charges their scanned bytes
/// to the session budget.
pub struct QueryExecutor {
    service: Arc<dyn QueryService>,
    budget: Arc<BudgetRegistry>,
    config: ExecutorConfig,
}

impl QueryExecutor {
    /// Create an executor with the default poll settings.
    pub fn new(service: Arc<dyn QueryService>, budget: Arc<BudgetRegistry>) -> Self {
        Self::with_config(service, budget, ExecutorConfig::default())
    }

    /// Create an executor with custom poll settings.
    pub fn with_config(
        service: Arc<dyn QueryService>,
        budget: Arc<BudgetRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            service,
            budget,
            config,
        }
    }

    /// Get the session budget this executor charges.
    pub fn budget(&self) -> &Arc<BudgetRegistry> {
        &self.budget
    }

    /// Get the poll settings.
    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Execute a query and wait for its result.
    ///
    /// Returns an empty result (`records: None`) when the backend finishes
    /// without one. When `budget_limit` is given, non-zero scanned bytes are
    /// added to the session tracker and the resulting warning and state are
    /// attached to the result. Does not enforce the budget; call
    /// [`BudgetRegistry::enforce_budget_limit`] first for that.
    pub async fn execute(
        &self,
        request: &ExecuteRequest,
        budget_limit: Option<BudgetLimit>,
    ) -> GrailResult<QueryResult> {
        debug!(query = %request.query, "Submitting DQL query");
        let submitted = self.service.submit(request).await?;

        let payload = match (submitted.result, submitted.request_token) {
            (Some(payload), _) => Some(payload),
            (None, Some(token)) => self.poll_until_done(&token).await?,
            (None, None) => {
                debug!(
                    state = submitted.state.as_ref().map(PollState::as_str).unwrap_or("<none>"),
                    "Query finished without result or token"
                );
                None
            }
        };

        let Some(payload) = payload else {
            return Ok(QueryResult::empty());
        };

        let mut result = QueryResult::from_payload(payload);
        if let Some(limit) = budget_limit {
            self.charge(&mut result, limit);
        }
        Ok(result)
    }

    async fn poll_until_done(&self, request_token: &str) -> GrailResult<Option<QueryPayload>> {
        for attempt in 1..=self.config.max_poll_attempts {
            tokio::time::sleep(self.config.poll_interval).await;

            let response = self.service.poll(request_token).await?;
            if response.is_pending() {
                debug!(
                    attempt,
                    state = response.state.as_ref().map(PollState::as_str).unwrap_or("<none>"),
                    progress = ?response.progress,
                    "Query still running"
                );
                continue;
            }

            if let Some(payload) = response.result {
                debug!(attempt, "Query result received");
                return Ok(Some(payload));
            }

            info!(
                state = response.state.as_ref().map(PollState::as_str).unwrap_or("<none>"),
                "Query ended without result"
            );
            return Ok(None);
        }

        warn!(
            request_token,
            attempts = self.config.max_poll_attempts,
            "Giving up on running query"
        );
        Err(GrailError::PollTimeout {
            request_token: request_token.to_string(),
            attempts: self.config.max_poll_attempts,
        })
    }

    fn charge(&self, result: &mut QueryResult, limit: BudgetLimit) {
        let Some(scanned_bytes) = result.scanned_bytes.filter(|bytes| *bytes > 0) else {
            return;
        };

        let tracker = self.budget.tracker(limit);
        let delta = i64::try_from(scanned_bytes).unwrap_or(i64::MAX);
        let warning = tracker.add_bytes_scanned(delta);
        let state = tracker.state();

        info!(
            scanned_bytes,
            total_bytes_scanned = state.total_bytes_scanned,
            usage_percentage = ?state.usage_percentage,
            "Charged query to Grail budget"
        );
        if let Some(warning) = &warning {
            warn!(
                kind = %warning.kind,
                usage_percentage = warning.usage_percentage,
                "Grail budget warning"
            );
        }

        result.budget_warning = warning.map(|w| w.message);
        result.budget_state = Some(state);
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
