//! MCP server implementation.
//!
//! Exposes a Dynatrace environment as MCP tools over stdio. DQL-backed tools
//! run through a [`QueryExecutor`] that charges the session Grail budget.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use serde_json::json;
use tracing::{debug, info, warn};

use dynatrace_client::{scopes, workflow, DynatraceClient, DynatraceEnv};
use dynatrace_grail::{
    format_query_result, BudgetLimit, BudgetRegistry, ExecuteRequest, ExecutorConfig,
    FormatOptions, QueryExecutor, QueryResult,
};

use crate::error::{McpError as DynatraceMcpError, McpResult};
use crate::queries;
use crate::render;
use crate::tools::{
    require, BudgetStatusOutput, CreateWorkflowInput, EntityDetailsInput, ExecuteDqlInput,
    FindEntityInput, KubernetesEventsInput, LogsForEntityInput, MakeWorkflowPublicInput,
    OwnershipInput, ProblemDetailsInput, SlackMessageInput, VerifyDqlInput,
    VulnerabilityDetailsInput,
};

/// Create a standardized error response for MCP tools.
///
/// Returns a JSON-formatted error with error code, message, and recovery suggestion.
fn tool_error(error: &DynatraceMcpError) -> CallToolResult {
    let code = error.error_code();
    let response = serde_json::json!({
        "error": code.to_string(),
        "code": code.code(),
        "message": error.to_string(),
        "suggestion": error.suggestion(),
    });
    CallToolResult::error(vec![Content::text(response.to_string())])
}

/// Turn a tool outcome into a tool result; failures become `isError` results.
fn text_result(tool: &'static str, result: McpResult<String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!(tool, error = %e, "Tool call failed");
            tool_error(&e)
        }
    }
}

/// Append the budget warning of a query, if any.
fn with_budget_warning(mut text: String, result: &QueryResult) -> String {
    if let Some(warning) = &result.budget_warning {
        text.push_str("\n\n");
        text.push_str(warning);
    }
    text
}

/// Configuration for the MCP server.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Environment URL used in links, without trailing slash.
    pub environment_url: String,
    /// Slack connection used by `send_slack_message`.
    pub slack_connection_id: String,
    /// Session Grail budget.
    pub grail_budget: BudgetLimit,
    /// Poll interval and attempt limit for DQL queries.
    pub executor: ExecutorConfig,
    /// Rendering of `execute_dql` results.
    pub format: FormatOptions,
}

impl McpServerConfig {
    /// Configuration for a validated environment, with default query settings.
    pub fn from_env(env: &DynatraceEnv) -> Self {
        Self {
            environment_url: env.environment_url.trim_end_matches('/').to_string(),
            slack_connection_id: env.slack_connection_id.clone(),
            grail_budget: env.grail_budget,
            executor: ExecutorConfig::default(),
            format: FormatOptions::default(),
        }
    }
}

/// Dynatrace MCP Server.
///
/// Implements the MCP server handler with problem, vulnerability, entity,
/// DQL, budget and workflow tools.
#[derive(Clone)]
pub struct DynatraceMcpServer {
    /// Platform API client.
    client: DynatraceClient,
    /// Grail budget of this session.
    budget: Arc<BudgetRegistry>,
    config: Arc<McpServerConfig>,
    /// Tool router for MCP.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DynatraceMcpServer {
    /// Create a new MCP server talking to the environment behind `client`.
    pub fn new(config: McpServerConfig, client: DynatraceClient) -> Self {
        info!(
            environment = %config.environment_url,
            grail_budget = %config.grail_budget,
            "Dynatrace MCP server initialized"
        );

        Self {
            client,
            budget: Arc::new(BudgetRegistry::new()),
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    // ========================================================================
    // Environment, problems, vulnerabilities
    // ========================================================================

    #[tool(description = "Get information about the connected Dynatrace Environment (Tenant)")]
    async fn get_environment_info(&self) -> Result<CallToolResult, McpError> {
        let result = async {
            let info = self.client.environment_info().await?;
            Ok::<_, DynatraceMcpError>(render::environment_info(&info, self.env_url()))
        };
        Ok(text_result("get_environment_info", result.await))
    }

    #[tool(description = "List all problems known on Dynatrace")]
    async fn list_problems(&self) -> Result<CallToolResult, McpError> {
        let result = async {
            let problems = self.client.list_problems().await?;
            debug!(count = problems.len(), "Listed problems");
            Ok::<_, DynatraceMcpError>(render::problem_list(&problems))
        };
        Ok(text_result("list_problems", result.await))
    }

    #[tool(description = "Get details of a problem on Dynatrace")]
    async fn get_problem_details(
        &self,
        Parameters(input): Parameters<ProblemDetailsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let problem_id = require(&input.problem_id, "problem_id")?;
            let problem = self.client.problem_details(problem_id).await?;
            Ok::<_, DynatraceMcpError>(render::problem_details(&problem, self.env_url()))
        };
        Ok(text_result("get_problem_details", result.await))
    }

    #[tool(description = "List all vulnerabilities from Dynatrace")]
    async fn list_vulnerabilities(&self) -> Result<CallToolResult, McpError> {
        let result = async {
            let problems = self.client.list_security_problems().await?;
            Ok::<_, DynatraceMcpError>(render::vulnerability_list(&problems, self.env_url()))
        };
        Ok(text_result("list_vulnerabilities", result.await))
    }

    #[tool(description = "Get details of a vulnerability by `securityProblemId` on Dynatrace")]
    async fn get_vulnerability_details(
        &self,
        Parameters(input): Parameters<VulnerabilityDetailsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let id = require(&input.security_problem_id, "security_problem_id")?;
            let problem = self.client.security_problem_details(id).await?;
            Ok::<_, DynatraceMcpError>(render::vulnerability_details(&problem, self.env_url()))
        };
        Ok(text_result("get_vulnerability_details", result.await))
    }

    // ========================================================================
    // Entities
    // ========================================================================

    #[tool(description = "Get the entityId of a monitored entity based on the name")]
    async fn find_entity_by_name(
        &self,
        Parameters(input): Parameters<FindEntityInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let name = require(&input.entity_name, "entity_name")?;
            let dql = queries::find_entity_query(name);
            let query = self.run_dql(ExecuteRequest::new(dql), scopes::FIND_ENTITY).await?;
            let text = render::entity_matches(name, query.records.as_deref());
            Ok::<_, DynatraceMcpError>(with_budget_warning(text, &query))
        };
        Ok(text_result("find_entity_by_name", result.await))
    }

    #[tool(description = "Get details of a monitored entity")]
    async fn get_entity_details(
        &self,
        Parameters(input): Parameters<EntityDetailsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let entity_id = require(&input.entity_id, "entity_id")?;
            let entity = self.client.entity_details(entity_id).await?;
            Ok::<_, DynatraceMcpError>(render::entity_details(&entity, self.env_url()))
        };
        Ok(text_result("get_entity_details", result.await))
    }

    #[tool(description = "Get Logs for a monitored entity based on name of the entity")]
    async fn get_logs_for_entity(
        &self,
        Parameters(input): Parameters<LogsForEntityInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let name = require(&input.entity_name, "entity_name")?;
            let dql = queries::logs_for_entity_query(name);
            let query = self.run_dql(ExecuteRequest::new(dql), scopes::LOGS).await?;
            let text = render::log_lines(query.records.as_deref());
            Ok::<_, DynatraceMcpError>(with_budget_warning(text, &query))
        };
        Ok(text_result("get_logs_for_entity", result.await))
    }

    #[tool(description = "Get detailed Ownership information for entities")]
    async fn get_ownership(
        &self,
        Parameters(input): Parameters<OwnershipInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let entity_ids = require(&input.entity_ids, "entity_ids")?;
            debug!(entity_ids, "Fetching ownership");
            let response = self
                .client
                .call_app_function(
                    "dynatrace.ownership",
                    "get-ownership-from-entity",
                    &json!({ "entityIds": entity_ids }),
                    scopes::OWNERSHIP,
                )
                .await?;
            Ok::<_, DynatraceMcpError>(render::ownership(&response))
        };
        Ok(text_result("get_ownership", result.await))
    }

    #[tool(description = "Get all events from a specific Kubernetes (K8s) cluster")]
    async fn get_kubernetes_events(
        &self,
        Parameters(input): Parameters<KubernetesEventsInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let dql = queries::kubernetes_events_query(input.cluster_id.as_deref());
            let query = self.run_dql(ExecuteRequest::new(dql), scopes::EVENTS).await?;
            let text = render::kubernetes_events(query.records.as_deref());
            Ok::<_, DynatraceMcpError>(with_budget_warning(text, &query))
        };
        Ok(text_result("get_kubernetes_events", result.await))
    }

    // ========================================================================
    // DQL and Grail budget
    // ========================================================================

    #[tool(description = "Verify a Dynatrace Query Language (DQL) statement")]
    async fn verify_dql(
        &self,
        Parameters(input): Parameters<VerifyDqlInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let statement = require(&input.dql_statement, "dql_statement")?;
            let response = self.client.verify_dql(statement).await?;
            Ok::<_, DynatraceMcpError>(render::dql_verification(&response))
        };
        Ok(text_result("verify_dql", result.await))
    }

    #[tool(
        description = "Execute a Dynatrace Query Language (DQL) statement. Every query is charged against the session Grail budget; the response reports scanned bytes, budget usage and a preview of the records."
    )]
    async fn execute_dql(
        &self,
        Parameters(input): Parameters<ExecuteDqlInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let statement = require(&input.dql_statement, "dql_statement")?;
            let mut request = ExecuteRequest::new(statement);
            if let Some(max) = input.max_result_records {
                request = request.with_max_result_records(max);
            }
            let query = self.run_dql(request, scopes::EXECUTE_DQL).await?;
            Ok::<_, DynatraceMcpError>(format_query_result(&query, &self.config.format))
        };
        Ok(text_result("execute_dql", result.await))
    }

    #[tool(
        description = "Get the Grail query budget of this session: bytes scanned so far, the configured limit and the share used."
    )]
    async fn get_grail_budget_status(&self) -> Result<CallToolResult, McpError> {
        let output = self.budget_output(None);
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(
        description = "Reset the Grail query budget of this session to zero so that DQL tools can run again after the budget was exceeded."
    )]
    async fn reset_grail_budget(&self) -> Result<CallToolResult, McpError> {
        self.budget.reset();
        let output = self.budget_output(Some(
            "Grail budget has been reset. DQL queries can be executed again.",
        ));
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    // ========================================================================
    // Notifications and workflows
    // ========================================================================

    #[tool(description = "Sends a Slack message via Slack Connector on Dynatrace")]
    async fn send_slack_message(
        &self,
        Parameters(input): Parameters<SlackMessageInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let channel = require(&input.channel, "channel")?;
            let message = require(&input.message, "message")?;
            let payload = json!({
                "message": message,
                "channel": channel,
                "connection": self.config.slack_connection_id,
                "workflowID": "foobar-123",
                "executionID": "exec-123",
                "executionDate": execution_date(),
                "appendToThread": false,
            });
            let response = self
                .client
                .call_app_function("dynatrace.slack", "slack-send-message", &payload, scopes::SLACK)
                .await?;
            Ok::<_, DynatraceMcpError>(render::slack_result(&response))
        };
        Ok(text_result("send_slack_message", result.await))
    }

    #[tool(description = "Create a notification workflow in Dynatrace")]
    async fn create_workflow_for_notification(
        &self,
        Parameters(input): Parameters<CreateWorkflowInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let team_name = require(input.team_name.as_deref().unwrap_or_default(), "team_name")?;
            let channel = require(input.channel.as_deref().unwrap_or_default(), "channel")?;
            let problem_type = input
                .problem_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("CUSTOM");

            let body =
                workflow::notification_workflow(team_name, channel, problem_type, input.is_private);
            let created = self.client.create_workflow(&body).await?;
            info!(workflow_id = %created.id, problem_type, "Notification workflow created");
            Ok::<_, DynatraceMcpError>(render::workflow_created(
                &created,
                input.is_private,
                self.env_url(),
            ))
        };
        Ok(text_result("create_workflow_for_notification", result.await))
    }

    #[tool(description = "Make a workflow public on Dynatrace")]
    async fn make_workflow_public(
        &self,
        Parameters(input): Parameters<MakeWorkflowPublicInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = async {
            let workflow_id = require(&input.workflow_id, "workflow_id")?;
            let updated = self
                .client
                .update_workflow(workflow_id, &json!({ "isPrivate": false }))
                .await?;
            Ok::<_, DynatraceMcpError>(render::workflow_public(&updated, self.env_url()))
        };
        Ok(text_result("make_workflow_public", result.await))
    }
}

impl DynatraceMcpServer {
    /// Grail budget of this session.
    pub fn budget(&self) -> &Arc<BudgetRegistry> {
        &self.budget
    }

    /// Server configuration.
    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    fn env_url(&self) -> &str {
        &self.config.environment_url
    }

    /// Run a DQL statement against the session budget.
    ///
    /// Refuses to submit anything once the budget is exceeded.
    async fn run_dql(
        &self,
        request: ExecuteRequest,
        scopes: &'static [&'static str],
    ) -> McpResult<QueryResult> {
        let limit = self.config.grail_budget;
        self.budget.enforce_budget_limit(limit)?;

        let executor = QueryExecutor::with_config(
            Arc::new(self.client.query_service(scopes)),
            Arc::clone(&self.budget),
            self.config.executor,
        );
        debug!(query = %request.query, "Executing DQL");
        Ok(executor.execute(&request, Some(limit)).await?)
    }

    fn budget_output(&self, message: Option<&str>) -> BudgetStatusOutput {
        let limit = self.config.grail_budget;
        let state = self.budget.budget_status(limit);
        let scanned_gb = dynatrace_grail::bytes_to_gb(state.total_bytes_scanned);

        let message = match (message, state.usage_percentage) {
            (Some(message), _) => message.to_string(),
            (None, Some(usage)) if state.is_budget_exceeded => format!(
                "Grail budget exceeded: {:.2} GB of {} used ({:.1}%). Use the \"reset_grail_budget\" tool to continue querying.",
                scanned_gb, limit, usage
            ),
            (None, Some(usage)) => format!(
                "{:.2} GB of {} Grail budget used ({:.1}%).",
                scanned_gb, limit, usage
            ),
            (None, None) => format!(
                "{:.2} GB scanned in this session; the Grail budget is unlimited.",
                scanned_gb
            ),
        };
        BudgetStatusOutput::from_state(&state, message)
    }
}

/// Timestamp passed to the Slack connector, in epoch milliseconds.
fn execution_date() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_default()
}

#[tool_handler]
impl rmcp::ServerHandler for DynatraceMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Dynatrace MCP Server - Investigate problems, vulnerabilities, entities and logs \
                 of a Dynatrace environment. Use `find_entity_by_name` to resolve entity IDs, \
                 `verify_dql` before `execute_dql`, and `get_grail_budget_status` to check how much \
                 of the session's Grail query budget is used. DQL tools stop once the budget is \
                 exceeded until `reset_grail_budget` is called."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server on stdio.
pub async fn run_server(
    config: McpServerConfig,
    client: DynatraceClient,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("Starting Dynatrace MCP server");

    let server = DynatraceMcpServer::new(config, client);

    // Serve on stdio. If the transport fails (e.g., stdin already closed),
    // treat it as a clean exit rather than an error.
    let service = match server.serve(stdio()).await {
        Ok(s) => s,
        Err(e) => {
            info!("MCP transport closed during setup: {}", e);
            return Ok(());
        }
    };

    // Connection close (client disconnect, stdin EOF) is expected.
    if let Err(e) = service.waiting().await {
        info!("MCP transport closed: {}", e);
    }

    info!("MCP server stopped");
    Ok(())
}
