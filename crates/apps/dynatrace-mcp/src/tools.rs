//! MCP tool input/output types.
//!
//! Argument names are snake_case; the camelCase names used by other
//! Dynatrace MCP servers (`problemId`, `dqlStatement`, ...) are accepted as
//! aliases so existing prompts keep working.

use dynatrace_grail::BudgetState;
use rmcp::schemars;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{McpError, McpResult};

/// Reject empty or whitespace-only required arguments.
pub fn require<'a>(value: &'a str, name: &'static str) -> McpResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(McpError::MissingParameter(name));
    }
    Ok(trimmed)
}

// ============================================================================
// Problems and vulnerabilities
// ============================================================================

/// Input for the `get_problem_details` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProblemDetailsInput {
    /// The `problemId` of the problem (not the display ID like P-1234).
    #[serde(alias = "problemId")]
    pub problem_id: String,
}

/// Input for the `get_vulnerability_details` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VulnerabilityDetailsInput {
    /// The `securityProblemId` of the vulnerability.
    #[serde(alias = "securityProblemId")]
    pub security_problem_id: String,
}

// ============================================================================
// Entities
// ============================================================================

/// Input for the `find_entity_by_name` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FindEntityInput {
    /// Name, or part of the name, of the monitored entity.
    #[serde(alias = "entityName")]
    pub entity_name: String,
}

/// Input for the `get_entity_details` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EntityDetailsInput {
    /// The `entityId`, e.g. `SERVICE-1234567890ABCDEF`.
    #[serde(alias = "entityId")]
    pub entity_id: String,
}

/// Input for the `get_logs_for_entity` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LogsForEntityInput {
    /// Name of the entity the logs originate from.
    #[serde(alias = "entityName")]
    pub entity_name: String,
}

/// Input for the `get_ownership` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct OwnershipInput {
    /// Comma separated list of `entityId`s.
    #[serde(alias = "entityIds")]
    pub entity_ids: String,
}

/// Input for the `get_kubernetes_events` tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct KubernetesEventsInput {
    /// The Kubernetes (K8s) Cluster Id, referred to as k8s.cluster.uid (this is NOT the Dynatrace environment).
    /// Events of all clusters are returned when omitted.
    #[serde(default, alias = "clusterId")]
    pub cluster_id: Option<String>,
}

// ============================================================================
// DQL
// ============================================================================

/// Input for the `verify_dql` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyDqlInput {
    /// The DQL statement to verify.
    #[serde(alias = "dqlStatement")]
    pub dql_statement: String,
}

/// Input for the `execute_dql` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteDqlInput {
    /// The DQL statement to execute.
    #[serde(alias = "dqlStatement")]
    pub dql_statement: String,

    /// Maximum number of records the backend returns.
    #[serde(default, alias = "maxResultRecords")]
    pub max_result_records: Option<u64>,
}

/// Output of the `get_grail_budget_status` and `reset_grail_budget` tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BudgetStatusOutput {
    /// Bytes scanned by queries in this session.
    pub total_bytes_scanned: i64,
    /// Same, in GB.
    pub total_gb_scanned: f64,
    /// Session ceiling in GB; absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_limit_gb: Option<f64>,
    /// Share of the ceiling used, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_percentage: Option<f64>,
    /// Whether DQL tools are currently blocked.
    pub is_budget_exceeded: bool,
    /// Human readable summary.
    pub message: String,
}

impl BudgetStatusOutput {
    pub fn from_state(state: &BudgetState, message: impl Into<String>) -> Self {
        Self {
            total_bytes_scanned: state.total_bytes_scanned,
            total_gb_scanned: dynatrace_grail::bytes_to_gb(state.total_bytes_scanned),
            budget_limit_gb: state.budget_limit_gb,
            usage_percentage: state.usage_percentage,
            is_budget_exceeded: state.is_budget_exceeded,
            message: message.into(),
        }
    }
}

// ============================================================================
// Notifications and workflows
// ============================================================================

/// Input for the `send_slack_message` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SlackMessageInput {
    /// Slack channel, e.g. `#alerts`.
    pub channel: String,
    /// Message text (Slack markdown).
    pub message: String,
}

/// Input for the `create_workflow_for_notification` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateWorkflowInput {
    /// Problem category to notify on, e.g. `AVAILABILITY`, `ERROR`, `SLOWDOWN`,
    /// `RESOURCE`, `CUSTOM`, `MONITORING_UNAVAILABLE`, `INFO` or `SECURITY`.
    #[serde(default, alias = "problemType")]
    pub problem_type: Option<String>,

    /// Team to notify.
    #[serde(default, alias = "teamName")]
    pub team_name: Option<String>,

    /// Slack channel the notification is posted to.
    #[serde(default)]
    pub channel: Option<String>,

    /// Create the workflow as private (default: false).
    #[serde(default, alias = "isPrivate")]
    pub is_private: bool,
}

/// Input for the `make_workflow_public` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MakeWorkflowPublicInput {
    /// ID of the workflow.
    #[serde(alias = "workflowId")]
    pub workflow_id: String,
}
