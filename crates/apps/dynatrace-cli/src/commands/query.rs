//! Query command.

use std::sync::Arc;

use dynatrace_client::{scopes, DynatraceClient};
use dynatrace_grail::{format_query_result, BudgetRegistry, ExecuteRequest, QueryExecutor};

use crate::config::Settings;
use crate::error::CliResult;

/// Execute one DQL statement and summarize the result.
///
/// Each invocation starts with an empty budget, so the configured limit
/// bounds what this single query may be charged before it is refused.
pub async fn query(
    client: &DynatraceClient,
    settings: &Settings,
    dql: &str,
    max_records: Option<u64>,
) -> CliResult<String> {
    let budget = Arc::new(BudgetRegistry::new());
    let limit = settings.server.grail_budget;
    budget.enforce_budget_limit(limit)?;

    let executor = QueryExecutor::with_config(
        Arc::new(client.query_service(scopes::EXECUTE_DQL)),
        budget,
        settings.server.executor,
    );

    let mut request = ExecuteRequest::new(dql);
    if let Some(max) = max_records {
        request = request.with_max_result_records(max);
    }

    let result = executor.execute(&request, Some(limit)).await?;
    Ok(format_query_result(&result, &settings.server.format))
}
