//! Integration tests for the submit-and-poll protocol using MockQueryService.
//!
//! Time is paused, so the 2 second poll interval elapses instantly while
//! `tokio::time::Instant` still observes it.

use std::sync::Arc;
use std::time::Duration;

use dynatrace_grail::{
    BudgetLimit, BudgetRegistry, ExecuteRequest, ExecutorConfig, GrailError, PollState,
    QueryExecutor, WarningKind,
};
use dynatrace_test_utils::{
    payload_with_metadata, payload_with_scan, poll_running, poll_state, poll_with_result,
    submit_empty, submit_with_result, submit_with_token, MockQueryService,
};
use serde_json::json;

fn executor(mock: &MockQueryService) -> (QueryExecutor, Arc<BudgetRegistry>) {
    let budget = Arc::new(BudgetRegistry::new());
    let executor = QueryExecutor::new(Arc::new(mock.clone()), Arc::clone(&budget));
    (executor, budget)
}

fn limit_10gb() -> BudgetLimit {
    BudgetLimit::from_gb(10.0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_empty_submit_returns_empty_result() {
    let mock = MockQueryService::new().with_submit(submit_empty());
    let (executor, budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert!(result.records.is_none());
    assert!(result.budget_state.is_none());
    assert_eq!(mock.poll_count(), 0);
    assert_eq!(budget.budget_status(limit_10gb()).total_bytes_scanned, 0);
}

#[tokio::test(start_paused = true)]
async fn test_synchronous_result_is_charged() {
    let mock =
        MockQueryService::new().with_submit(submit_with_result(payload_with_scan(1_000_000_000)));
    let (executor, budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert_eq!(result.scanned_bytes, Some(1_000_000_000));
    assert_eq!(result.scanned_records, Some(1));
    assert_eq!(result.sampled, Some(false));
    assert_eq!(mock.poll_count(), 0);
    assert_eq!(mock.submitted()[0].query, "fetch logs");
    assert_eq!(budget.budget_status(limit_10gb()).total_bytes_scanned, 1_000_000_000);
}

#[tokio::test(start_paused = true)]
async fn test_two_running_polls_then_result() {
    let mock = MockQueryService::new()
        .with_submit(submit_with_token("tok-1"))
        .with_poll(poll_running())
        .with_poll(poll_running())
        .with_poll(poll_with_result(payload_with_scan(2_000_000_000)));
    let (executor, _budget) = executor(&mock);

    let started = tokio::time::Instant::now();
    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert_eq!(mock.poll_count(), 3);
    assert_eq!(mock.polled_tokens(), vec!["tok-1"; 3]);
    assert!(started.elapsed() >= Duration::from_secs(6));

    assert_eq!(result.records.as_ref().map(Vec::len), Some(1));
    assert_eq!(result.scanned_bytes, Some(2_000_000_000));
    assert!(result.budget_warning.is_none());
    let state = result.budget_state.unwrap();
    assert_eq!(state.usage_percentage, Some(20.0));
    assert!(!state.is_budget_exceeded);
}

#[tokio::test(start_paused = true)]
async fn test_not_started_keeps_polling() {
    let mock = MockQueryService::new()
        .with_submit(submit_with_token("tok-2"))
        .with_poll(poll_state(PollState::NotStarted))
        .with_poll(poll_with_result(payload_with_scan(10)));
    let (executor, _budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch spans"), None)
        .await
        .unwrap();

    assert_eq!(mock.poll_count(), 2);
    assert!(result.records.is_some());
    assert!(result.budget_state.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_state_returns_empty_result() {
    let mock = MockQueryService::new()
        .with_submit(submit_with_token("tok-3"))
        .with_poll(poll_running())
        .with_poll(poll_state(PollState::Failed));
    let (executor, budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert!(result.records.is_none());
    assert_eq!(mock.poll_count(), 2);
    assert_eq!(budget.budget_status(limit_10gb()).total_bytes_scanned, 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout() {
    let mock = MockQueryService::new().with_submit(submit_with_token("stuck"));
    let budget = Arc::new(BudgetRegistry::new());
    let executor = QueryExecutor::with_config(
        Arc::new(mock.clone()),
        budget,
        ExecutorConfig {
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 5,
        },
    );

    let err = executor
        .execute(&ExecuteRequest::new("fetch logs"), None)
        .await
        .unwrap_err();

    match err {
        GrailError::PollTimeout {
            request_token,
            attempts,
        } => {
            assert_eq!(request_token, "stuck");
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.poll_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_propagates() {
    let mock = MockQueryService::new().with_failure(403);
    let (executor, _budget) = executor(&mock);

    let err = executor
        .execute(&ExecuteRequest::new("fetch logs"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GrailError::Transport { status: Some(403), .. }));
}

#[tokio::test(start_paused = true)]
async fn test_zero_bytes_do_not_touch_budget() {
    let mock = MockQueryService::new().with_submit(submit_with_result(payload_with_scan(0)));
    let (executor, budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert_eq!(result.scanned_bytes, Some(0));
    assert!(result.budget_state.is_none());
    assert!(budget.current().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_snake_case_metadata_aliases() {
    let payload = payload_with_metadata(
        vec![json!({ "x": 1 })],
        json!({ "scanned_bytes": 3_000_000_000_u64, "scanned_records": 9 }),
    );
    let mock = MockQueryService::new().with_submit(submit_with_result(payload));
    let (executor, budget) = executor(&mock);

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
        .await
        .unwrap();

    assert_eq!(result.scanned_bytes, Some(3_000_000_000));
    assert_eq!(result.scanned_records, Some(9));
    assert_eq!(budget.budget_status(limit_10gb()).total_bytes_scanned, 3_000_000_000);
}

#[tokio::test(start_paused = true)]
async fn test_warnings_accumulate_across_queries() {
    let mock = MockQueryService::new()
        .with_submit(submit_with_result(payload_with_scan(8_500_000_000)))
        .with_submit(submit_with_result(payload_with_scan(2_000_000_000)));
    let (executor, budget) = executor(&mock);
    let request = ExecuteRequest::new("fetch logs");

    let first = executor.execute(&request, Some(limit_10gb())).await.unwrap();
    assert!(first
        .budget_warning
        .unwrap()
        .contains("Approaching Grail Budget Limit"));
    assert!(budget.enforce_budget_limit(limit_10gb()).is_ok());

    let second = executor.execute(&request, Some(limit_10gb())).await.unwrap();
    assert!(second.budget_warning.unwrap().contains("Grail Budget Exceeded"));
    assert!(second.budget_state.unwrap().is_budget_exceeded);

    let err = budget.enforce_budget_limit(limit_10gb()).unwrap_err();
    assert!(matches!(err, GrailError::BudgetExceeded { .. }));
    assert_eq!(
        budget
            .tracker(limit_10gb())
            .add_bytes_scanned(0)
            .map(|w| w.kind),
        Some(WarningKind::Exceeded)
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_executions_share_budget() {
    let mut mock = MockQueryService::new();
    for i in 0..4 {
        mock = mock
            .with_submit(submit_with_token(&format!("tok-{i}")))
            .with_poll(poll_with_result(payload_with_scan(1_000_000_000)));
    }
    let (executor, budget) = executor(&mock);
    let executor = Arc::new(executor);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let executor = Arc::clone(&executor);
            tokio::spawn(async move {
                executor
                    .execute(&ExecuteRequest::new("fetch logs"), Some(limit_10gb()))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(budget.budget_status(limit_10gb()).total_bytes_scanned, 4_000_000_000);
}
