//! Construction of problem notification workflows.

use serde::Serialize;
use serde_json::{json, Value};

/// Event query that triggers on new critical or high vulnerabilities.
const SECURITY_TRIGGER_QUERY: &str = "event.kind==\"SECURITY_EVENT\"
        and event.type==\"VULNERABILITY_STATUS_CHANGE_EVENT\"
        and event.level == \"ENTITY\"
        and affected_entity.type==\"PROCESS_GROUP\"
        and event.status_transition==\"NEW_OPEN\"
        and (vulnerability.risk.level==\"CRITICAL\" or
        vulnerability.risk.level==\"HIGH\")";

/// Davis problem categories a workflow can trigger on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemCategories {
    pub monitoring_unavailable: bool,
    pub availability: bool,
    pub error: bool,
    pub slowdown: bool,
    pub resource: bool,
    pub custom: bool,
    pub info: bool,
}

impl ProblemCategories {
    /// Categories for a problem type name; unknown names map to `custom`.
    pub fn for_problem_type(problem_type: &str) -> Self {
        let mut categories = Self::default();
        match problem_type.to_uppercase().as_str() {
            "MONITORING_UNAVAILABLE" => categories.monitoring_unavailable = true,
            "AVAILABILITY" => categories.availability = true,
            "ERROR" => categories.error = true,
            "SLOWDOWN" => categories.slowdown = true,
            "RESOURCE" => categories.resource = true,
            "INFO" => categories.info = true,
            _ => categories.custom = true,
        }
        categories
    }
}

/// Check whether the problem type asks for vulnerability notifications.
pub fn is_security_problem_type(problem_type: &str) -> bool {
    problem_type.to_uppercase().contains("SECURITY")
}

/// Trigger configuration for the given problem type.
pub fn trigger_configuration(problem_type: &str) -> Value {
    if is_security_problem_type(problem_type) {
        json!({
            "type": "event",
            "value": { "eventType": "events", "query": SECURITY_TRIGGER_QUERY }
        })
    } else {
        json!({
            "type": "davis-problem",
            "value": { "categories": ProblemCategories::for_problem_type(problem_type) }
        })
    }
}

/// Build a simple workflow that posts to a Slack channel when a problem of
/// `problem_type` opens.
pub fn notification_workflow(
    team_name: &str,
    channel: &str,
    problem_type: &str,
    is_private: bool,
) -> Value {
    json!({
        "title": format!("[MCP POC] Notify team {} on problem of type {}", team_name, problem_type),
        "description": format!(
            "Automatically created workflow to notify team {} on problems of type {} - please delete me after the demo!",
            team_name, problem_type
        ),
        "isPrivate": is_private,
        "type": "SIMPLE",
        "tasks": {
            "send_notification": {
                "name": "Send notification",
                "action": "dynatrace.slack:slack-send-message",
                "description": "Sends a notification to a Slack channel",
                "input": {
                    "connectionId": "slack-connection-id",
                    "channel": format!("{{{{ \"{}\" }}}}", channel),
                    "message": format!(
                        "🚨 Alert for Team {}\n*Problem Type*: {}\n*Problem ID*: {{{{ event()[\"display_id\"] }}}}\n*Status*: {{{{ event()[\"event.status\"] }}}}\n\n<{{{{ environment().url }}}}/ui/apps/dynatrace.davis.problems/problem/{{{{ event()[\"event.id\"] }}}}|Click here for details>",
                        team_name, problem_type
                    ),
                },
                "active": true,
            }
        },
        "trigger": {
            "eventTrigger": {
                "isActive": true,
                "triggerConfiguration": trigger_configuration(problem_type),
            }
        }
    })
}
