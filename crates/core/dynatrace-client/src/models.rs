//! Response types of the classic environment and automation APIs.
//!
//! Only the fields the MCP tools read are typed; everything is optional
//! because the APIs omit fields freely depending on the `fields` parameter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemList {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub problems: Vec<Problem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Problem {
    pub problem_id: String,
    pub display_id: String,
    pub title: String,
    pub severity_level: Option<String>,
    pub status: Option<String>,
    /// Unix epoch milliseconds.
    pub start_time: Option<i64>,
    pub affected_entities: Vec<EntityStub>,
    pub root_cause_entity: Option<EntityStub>,
    pub impact_analysis: Option<ImpactAnalysis>,
}

/// Reference to an entity inside another object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityStub {
    pub entity_id: Option<EntityId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityId {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactAnalysis {
    pub impacts: Vec<Impact>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Impact {
    pub estimated_affected_users: u64,
}

impl Problem {
    /// Sum of the estimated affected users over all impacts, if analysed.
    pub fn estimated_affected_users(&self) -> Option<u64> {
        self.impact_analysis
            .as_ref()
            .map(|analysis| analysis.impacts.iter().map(|i| i.estimated_affected_users).sum())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityProblemList {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub security_problems: Vec<SecurityProblem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityProblem {
    pub security_problem_id: String,
    pub display_id: String,
    pub title: String,
    pub technology: Option<String>,
    pub external_vulnerability_id: Option<String>,
    pub cve_ids: Vec<String>,
    pub description: Option<String>,
    pub remediation_description: Option<String>,
    pub risk_assessment: Option<RiskAssessment>,
    pub affected_entities: Vec<String>,
    pub exposed_entities: Vec<String>,
    pub entry_points: Option<EntryPoints>,
    pub code_level_vulnerability_details: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskAssessment {
    pub risk_score: Option<f64>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPoints {
    pub items: Vec<EntryPoint>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryPoint {
    pub source_http_path: Option<String>,
}

impl SecurityProblem {
    pub fn risk_score(&self) -> Option<f64> {
        self.risk_assessment.as_ref().and_then(|r| r.risk_score)
    }
}

/// A monitored entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entity {
    pub entity_id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub properties: Option<Value>,
}

/// Workflow as returned by the automation API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workflow {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub workflow_type: Option<String>,
    pub is_private: Option<bool>,
}
