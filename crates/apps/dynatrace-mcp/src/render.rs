//! Text responses of the pass-through tools.
//!
//! Responses are plain text addressed to the assistant: they name the IDs to
//! use in follow-up tool calls and link into the Dynatrace apps.

use dynatrace_client::{Entity, Problem, SecurityProblem, Workflow};
use dynatrace_grail::VerifyResponse;
use serde_json::Value;

use crate::queries::ENTITY_SEARCH_LIMIT;

/// Vulnerabilities above this risk score get an escalation hint.
const HIGH_RISK_SCORE: f64 = 8.0;

const OWNERSHIP_DOCS: &str = "https://docs.dynatrace.com/docs/deliver/ownership";

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

/// `get_environment_info` response.
pub fn environment_info(info: &Value, environment_url: &str) -> String {
    format!(
        "Environment Information (also referred to as tenant):\n{}\nYou can reach it via {}\n",
        info, environment_url
    )
}

/// `list_problems` response.
pub fn problem_list(problems: &[Problem]) -> String {
    if problems.is_empty() {
        return "No problems found".to_string();
    }
    let entries: Vec<String> = problems
        .iter()
        .map(|p| {
            format!(
                "{} (please refer to this problem with `problemId` {}): {}",
                p.display_id, p.problem_id, p.title
            )
        })
        .collect();
    format!("Found these problems: {}", entries.join(","))
}

/// `get_problem_details` response.
pub fn problem_details(problem: &Problem, environment_url: &str) -> String {
    let mut resp = format!(
        "The problem {} with the title {} (ID: {}). The severity is {}, and it affects {} entities:\n",
        problem.display_id,
        problem.title,
        problem.problem_id,
        or_unknown(problem.severity_level.as_deref()),
        problem.affected_entities.len()
    );

    for entity in &problem.affected_entities {
        resp.push_str(&format!(
            "- {} (please refer to this entity with `entityId` {})\n",
            or_unknown(entity.name.as_deref()),
            or_unknown(entity.entity_id.as_ref().and_then(|id| id.id.as_deref()))
        ));
    }

    if let Some(start_time) = problem.start_time {
        resp.push_str(&format!("The problem first appeared at {}\n", start_time));
    }

    if let Some(root_cause) = &problem.root_cause_entity {
        resp.push_str(&format!(
            "The possible root-cause could be in entity {} with `entityId` {}.\n",
            or_unknown(root_cause.name.as_deref()),
            or_unknown(root_cause.entity_id.as_ref().and_then(|id| id.id.as_deref()))
        ));
    }

    if let Some(users) = problem.estimated_affected_users() {
        resp.push_str(&format!(
            "The problem is estimated to affect {} users.\n",
            users
        ));
    }

    resp.push_str(&format!(
        "Tell the user to access the link {}/ui/apps/dynatrace.davis.problems/problem/{} to get more insights into the problem.\n",
        environment_url, problem.problem_id
    ));
    resp
}

/// `list_vulnerabilities` response.
pub fn vulnerability_list(problems: &[SecurityProblem], environment_url: &str) -> String {
    if problems.is_empty() {
        return "No vulnerabilities found".to_string();
    }

    let mut resp = "Found the following vulnerabilities:".to_string();
    for sp in problems {
        resp.push_str(&format!(
            "\n* {} (please refer to this vulnerability with `securityProblemId` {}): {} (Technology: {}, External Vulnerability ID: {}, CVE: {})",
            sp.display_id,
            sp.security_problem_id,
            sp.title,
            or_unknown(sp.technology.as_deref()),
            or_unknown(sp.external_vulnerability_id.as_deref()),
            sp.cve_ids.join(", ")
        ));
    }
    resp.push_str(&format!(
        "\nWe recommend to take a look at {}/ui/apps/dynatrace.security.vulnerabilities to get a better overview of vulnerabilities.\n",
        environment_url
    ));
    resp
}

/// `get_vulnerability_details` response.
pub fn vulnerability_details(sp: &SecurityProblem, environment_url: &str) -> String {
    let cves = if sp.cve_ids.is_empty() {
        "unknown".to_string()
    } else {
        sp.cve_ids.join(",")
    };

    let mut resp = format!(
        "The Security Problem (Vulnerability) {} with securityProblemId {} has the title {}.\n",
        sp.display_id, sp.security_problem_id, sp.title
    );
    resp.push_str(&format!("The related CVEs are {}.\n", cves));
    resp.push_str(&format!(
        "The description is: {}.\n",
        or_unknown(sp.description.as_deref())
    ));
    resp.push_str(&format!(
        "The remediation description is: {}.\n",
        or_unknown(sp.remediation_description.as_deref())
    ));

    if sp.affected_entities.is_empty() {
        resp.push_str("This vulnerability does not seem to affect any entities.\n");
    } else {
        resp.push_str("The vulnerability affects the following entities:\n");
        for entity in &sp.affected_entities {
            resp.push_str(&format!("* {}\n", entity));
        }
    }

    if let Some(details) = &sp.code_level_vulnerability_details {
        resp.push_str(&format!(
            "Please investigate this on code-level: {}\n",
            details
        ));
    }

    if sp.exposed_entities.is_empty() {
        resp.push_str("This vulnerability does not seem to expose any entities.\n");
    } else {
        resp.push_str("The vulnerability exposes the following entities:\n");
        for entity in &sp.exposed_entities {
            resp.push_str(&format!("* {}\n", entity));
        }
    }

    match &sp.entry_points {
        Some(entry_points) => {
            resp.push_str("The following entrypoints are affected:\n");
            for entry_point in &entry_points.items {
                resp.push_str(&format!(
                    "* {}\n",
                    or_unknown(entry_point.source_http_path.as_deref())
                ));
            }
            if entry_points.truncated {
                resp.push_str("The list of entry points was truncated.\n");
            }
        }
        None => resp.push_str("This vulnerability does not seem to affect any entrypoints.\n"),
    }

    if sp.risk_score().is_some_and(|score| score > HIGH_RISK_SCORE) {
        resp.push_str(
            "The vulnerability has a high-risk score. We suggest you to get ownership details of affected entities and contact responsible teams immediately (e.g, via send_slack_message)\n",
        );
    }

    resp.push_str(&format!(
        "Tell the user to access the link {}/ui/apps/dynatrace.security.vulnerabilities/vulnerabilities/{} to get more insights into the vulnerability / security problem.\n",
        environment_url, sp.security_problem_id
    ));
    resp
}

/// `get_entity_details` response, with a deep link for entity types that have one.
pub fn entity_details(entity: &Entity, environment_url: &str) -> String {
    let properties = entity
        .properties
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "{}".to_string());
    let mut resp = format!(
        "Entity {} of type {} with `entityId` {}\nProperties: {}\n",
        entity.display_name, entity.entity_type, entity.entity_id, properties
    );

    let id = &entity.entity_id;
    let link = match entity.entity_type.as_str() {
        "SERVICE" => Some(format!(
            "You can find more information at {}/ui/apps/dynatrace.services/explorer?detailsId={}",
            environment_url, id
        )),
        "HOST" => Some(format!(
            "You can find more information at {}/ui/apps/dynatrace.infraops/hosts/{}",
            environment_url, id
        )),
        "KUBERNETES_CLUSTER" => Some(format!(
            "More info: {}/ui/apps/dynatrace.infraops/kubernetes/{}",
            environment_url, id
        )),
        "CLOUD_APPLICATION" => Some(format!(
            "Details: {}/ui/apps/dynatrace.kubernetes/explorer/workload?detailsId={}",
            environment_url, id
        )),
        _ => None,
    };
    if let Some(link) = link {
        resp.push_str(&link);
    }
    resp
}

/// `find_entity_by_name` response from the records of the entity search.
pub fn entity_matches(entity_name: &str, records: Option<&[Value]>) -> String {
    let records = match records {
        Some(records) if !records.is_empty() => records,
        _ => return "No monitored entity found with the specified name.".to_string(),
    };

    let mut resp = format!(
        "Found {} monitored entities matching \"{}\":\n",
        records.len(),
        entity_name
    );
    for entity in records.iter().filter(|r| !r.is_null()) {
        resp.push_str(&format!(
            "- Entity '{}' of type '{}' has entity id '{}'\n",
            field(entity, "entity.name"),
            field(entity, "entity.type"),
            field(entity, "id")
        ));
    }
    if records.len() >= ENTITY_SEARCH_LIMIT {
        resp.push_str(&format!(
            "\nNote: Results limited to {} entities. Refine your search for more specific results.\n",
            ENTITY_SEARCH_LIMIT
        ));
    }
    resp
}

/// Render a record field as text; strings without quotes.
fn field(record: &Value, name: &str) -> String {
    match record.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// `get_logs_for_entity` response: the `content` of each log record.
pub fn log_lines(records: Option<&[Value]>) -> String {
    let lines: Option<Vec<Value>> = records.map(|records| {
        records
            .iter()
            .map(|record| match record.get("content") {
                Some(content) if !record.is_null() => content.clone(),
                _ => Value::String("Empty log".to_string()),
            })
            .collect()
    });
    format!("Logs:\n{}", json_or_null(&lines))
}

/// `get_kubernetes_events` response.
pub fn kubernetes_events(records: Option<&[Value]>) -> String {
    format!("Kubernetes Events:\n{}", json_or_null(&records))
}

fn json_or_null<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// `verify_dql` response.
pub fn dql_verification(response: &VerifyResponse) -> String {
    let mut resp = "DQL Statement Verification:\n".to_string();

    if !response.notifications.is_empty() {
        resp.push_str("Notifications for adapting your DQL statement:\n");
        for note in &response.notifications {
            resp.push_str(&format!(
                "* {}: {}\n",
                or_unknown(note.severity.as_deref()),
                or_unknown(note.message.as_deref())
            ));
        }
    }

    if response.valid {
        resp.push_str("The DQL statement is valid - you can use the \"execute_dql\" tool.\n");
    } else {
        resp.push_str("The DQL statement is invalid. Please adapt your statement.\n");
    }
    resp
}

/// `send_slack_message` response from the app-function answer.
pub fn slack_result(response: &Value) -> String {
    match response.get("error").filter(|e| !e.is_null()) {
        Some(error) => format!("Error sending message to Slack: {}", plain(error)),
        None => format!(
            "Message sent to Slack: {}",
            response.get("result").unwrap_or(&Value::Null)
        ),
    }
}

/// `get_ownership` response from the app-function answer.
pub fn ownership(response: &Value) -> String {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return format!("Error: {}", plain(error));
    }

    let result = response.get("result").unwrap_or(&Value::Null);
    let no_owners = result
        .get("owners")
        .and_then(Value::as_array)
        .is_some_and(|owners| owners.is_empty());
    if no_owners {
        return format!(
            "No owners found - please check out how to setup owners on {}",
            OWNERSHIP_DOCS
        );
    }
    format!("Ownership information:\n{}", result)
}

/// Strings without JSON quotes, anything else as JSON.
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `create_workflow_for_notification` response.
pub fn workflow_created(workflow: &Workflow, is_private: bool, environment_url: &str) -> String {
    let mut resp = format!(
        "Workflow Created: {} with name {}.\nYou can access it at {}/ui/apps/dynatrace.automations/workflows/{}\n",
        workflow.id, workflow.title, environment_url, workflow.id
    );

    match workflow.workflow_type.as_deref() {
        Some("SIMPLE") => resp.push_str("Note: Simple workflows are not billed.\n"),
        Some("STANDARD") => resp.push_str("Note: Standard workflows are billed.\n"),
        _ => {}
    }

    if is_private {
        resp.push_str("This workflow is private and only accessible by the owner.\n");
    }
    resp
}

/// `make_workflow_public` response.
pub fn workflow_public(workflow: &Workflow, environment_url: &str) -> String {
    format!(
        "Workflow {} is now public!\nView it at: {}/ui/apps/dynatrace.automations/workflows/{}",
        workflow.id, environment_url, workflow.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENV: &str = "https://abc123.apps.dynatrace.com";

    fn problem() -> Problem {
        serde_json::from_value(json!({
            "problemId": "-123_456V2",
            "displayId": "P-2501",
            "title": "High failure rate",
            "severityLevel": "ERROR",
            "startTime": 1_700_000_000_000_i64,
            "affectedEntities": [{ "entityId": { "id": "SERVICE-1", "type": "SERVICE" }, "name": "checkout" }],
            "rootCauseEntity": { "entityId": { "id": "HOST-9", "type": "HOST" }, "name": "db-01" },
            "impactAnalysis": { "impacts": [{ "estimatedAffectedUsers": 42 }] }
        }))
        .unwrap()
    }

    #[test]
    fn test_environment_info() {
        assert_eq!(
            environment_info(&json!({ "environmentId": "abc123" }), ENV),
            "Environment Information (also referred to as tenant):\n{\"environmentId\":\"abc123\"}\nYou can reach it via https://abc123.apps.dynatrace.com\n"
        );
    }

    #[test]
    fn test_problem_list() {
        assert_eq!(problem_list(&[]), "No problems found");
        assert_eq!(
            problem_list(&[problem()]),
            "Found these problems: P-2501 (please refer to this problem with `problemId` -123_456V2): High failure rate"
        );
    }

    #[test]
    fn test_problem_details() {
        let text = problem_details(&problem(), ENV);

        assert!(text.starts_with("The problem P-2501 with the title High failure rate (ID: -123_456V2). The severity is ERROR, and it affects 1 entities:\n"));
        assert!(
            text.contains("- checkout (please refer to this entity with `entityId` SERVICE-1)\n")
        );
        assert!(text.contains("The problem first appeared at 1700000000000\n"));
        assert!(text.contains("root-cause could be in entity db-01 with `entityId` HOST-9."));
        assert!(text.contains("estimated to affect 42 users."));
        assert!(text.contains(
            "https://abc123.apps.dynatrace.com/ui/apps/dynatrace.davis.problems/problem/-123_456V2"
        ));
    }

    #[test]
    fn test_vulnerability_list() {
        let sp: SecurityProblem = serde_json::from_value(json!({
            "securityProblemId": "42",
            "displayId": "S-42",
            "title": "Log4Shell",
            "technology": "JAVA",
            "externalVulnerabilityId": "SNYK-1",
            "cveIds": ["CVE-2021-44228", "CVE-2021-45046"]
        }))
        .unwrap();

        let text = vulnerability_list(&[sp], ENV);
        assert!(text.starts_with("Found the following vulnerabilities:\n* S-42 (please refer to this vulnerability with `securityProblemId` 42): Log4Shell (Technology: JAVA, External Vulnerability ID: SNYK-1, CVE: CVE-2021-44228, CVE-2021-45046)"));
        assert!(
            text.contains("/ui/apps/dynatrace.security.vulnerabilities to get a better overview")
        );
        assert_eq!(vulnerability_list(&[], ENV), "No vulnerabilities found");
    }

    #[test]
    fn test_vulnerability_details_high_risk() {
        let sp: SecurityProblem = serde_json::from_value(json!({
            "securityProblemId": "42",
            "displayId": "S-42",
            "title": "Log4Shell",
            "riskAssessment": { "riskScore": 10.0 },
            "affectedEntities": ["PROCESS_GROUP-1"],
            "entryPoints": { "items": [{ "sourceHttpPath": "/api/login" }], "truncated": true }
        }))
        .unwrap();

        let text = vulnerability_details(&sp, ENV);
        assert!(text.contains("The related CVEs are unknown.\n"));
        assert!(
            text.contains("The vulnerability affects the following entities:\n* PROCESS_GROUP-1\n")
        );
        assert!(text.contains("This vulnerability does not seem to expose any entities.\n"));
        assert!(text.contains("* /api/login\nThe list of entry points was truncated.\n"));
        assert!(text.contains("high-risk score"));
        assert!(text.contains("/ui/apps/dynatrace.security.vulnerabilities/vulnerabilities/42"));
    }

    #[test]
    fn test_vulnerability_details_low_risk_has_no_escalation() {
        let sp: SecurityProblem = serde_json::from_value(json!({
            "securityProblemId": "7",
            "displayId": "S-7",
            "title": "Minor",
            "riskAssessment": { "riskScore": 8.0 }
        }))
        .unwrap();

        let text = vulnerability_details(&sp, ENV);
        assert!(!text.contains("high-risk score"));
        assert!(text.contains("does not seem to affect any entrypoints"));
    }

    #[test]
    fn test_entity_details_links_by_type() {
        let mut entity = Entity {
            entity_id: "HOST-1".into(),
            display_name: "web-01".into(),
            entity_type: "HOST".into(),
            properties: Some(json!({ "osType": "LINUX" })),
        };
        let text = entity_details(&entity, ENV);
        assert!(text.starts_with(
            "Entity web-01 of type HOST with `entityId` HOST-1\nProperties: {\"osType\":\"LINUX\"}\n"
        ));
        assert!(text.ends_with("/ui/apps/dynatrace.infraops/hosts/HOST-1"));

        entity.entity_type = "PROCESS_GROUP".into();
        assert!(!entity_details(&entity, ENV).contains("/ui/apps/"));
    }

    #[test]
    fn test_entity_matches() {
        let records = vec![json!({
            "id": "SERVICE-1",
            "entity.name": "checkout",
            "entity.type": "SERVICE"
        })];
        assert_eq!(
            entity_matches("check", Some(records.as_slice())),
            "Found 1 monitored entities matching \"check\":\n- Entity 'checkout' of type 'SERVICE' has entity id 'SERVICE-1'\n"
        );
        assert_eq!(
            entity_matches("nothing", Some(&[][..])),
            "No monitored entity found with the specified name."
        );
        assert_eq!(
            entity_matches("nothing", None),
            "No monitored entity found with the specified name."
        );
    }

    #[test]
    fn test_entity_matches_limit_note() {
        let records: Vec<Value> = (0..ENTITY_SEARCH_LIMIT)
            .map(|i| {
                json!({ "id": format!("HOST-{}", i), "entity.name": "web", "entity.type": "HOST" })
            })
            .collect();
        assert!(entity_matches("web", Some(records.as_slice()))
            .contains("Results limited to 50 entities"));
    }

    #[test]
    fn test_log_lines() {
        let records = vec![json!({ "content": "started" }), json!({ "status": "INFO" })];
        assert_eq!(log_lines(Some(records.as_slice())), "Logs:\n[\"started\",\"Empty log\"]");
        assert_eq!(log_lines(None), "Logs:\nnull");
    }

    #[test]
    fn test_dql_verification() {
        let response: VerifyResponse = serde_json::from_value(json!({
            "valid": false,
            "notifications": [{ "severity": "ERROR", "message": "Unknown command `fetchh`." }]
        }))
        .unwrap();

        assert_eq!(
            dql_verification(&response),
            "DQL Statement Verification:\nNotifications for adapting your DQL statement:\n* ERROR: Unknown command `fetchh`.\nThe DQL statement is invalid. Please adapt your statement.\n"
        );
    }

    #[test]
    fn test_slack_result() {
        assert_eq!(
            slack_result(&json!({ "error": "Not enough parameters provided" })),
            "Error sending message to Slack: Not enough parameters provided"
        );
        assert_eq!(
            slack_result(&json!({ "result": { "ok": true } })),
            "Message sent to Slack: {\"ok\":true}"
        );
    }

    #[test]
    fn test_ownership() {
        assert!(ownership(&json!({ "result": { "owners": [] } })).starts_with("No owners found"));
        assert_eq!(
            ownership(&json!({ "result": { "owners": [{ "name": "team-a" }] } })),
            "Ownership information:\n{\"owners\":[{\"name\":\"team-a\"}]}"
        );
        assert_eq!(ownership(&json!({ "error": "bad" })), "Error: bad");
    }

    #[test]
    fn test_workflow_created() {
        let workflow = Workflow {
            id: "wf-1".into(),
            title: "Notify".into(),
            workflow_type: Some("SIMPLE".into()),
            is_private: Some(true),
        };
        let text = workflow_created(&workflow, true, ENV);
        assert!(text.starts_with("Workflow Created: wf-1 with name Notify.\nYou can access it at https://abc123.apps.dynatrace.com/ui/apps/dynatrace.automations/workflows/wf-1\n"));
        assert!(text.contains("Simple workflows are not billed"));
        assert!(text.contains("only accessible by the owner"));
    }

    #[test]
    fn test_workflow_public() {
        let workflow = Workflow {
            id: "wf-1".into(),
            ..Default::default()
        };
        assert_eq!(
            workflow_public(&workflow, ENV),
            "Workflow wf-1 is now public!\nView it at: https://abc123.apps.dynatrace.com/ui/apps/dynatrace.automations/workflows/wf-1"
        );
    }
}
