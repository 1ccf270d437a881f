//! Wire types of the Grail storage query API.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::budget::BudgetState;

/// Body of a `query:execute` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// The DQL statement.
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeframe_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_timeframe_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_result_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_result_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_milliseconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sampling_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_scan_limit_gbytes: Option<f64>,
}

impl ExecuteRequest {
    /// Create a request for `query` with backend defaults for everything else.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Cap the number of returned records.
    pub fn with_max_result_records(mut self, max: u64) -> Self {
        self.max_result_records = Some(max);
        self
    }
}

/// State reported by `query:execute` and `query:poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PollState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// Any state this client does not know.
    Other(String),
}

impl PollState {
    /// Check whether the query may still produce a result.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Running)
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PollState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NOT_STARTED" => Self::NotStarted,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<PollState> for String {
    fn from(state: PollState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result payload carried by execute and poll responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Response of `query:execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PollState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryPayload>,
}

/// Response of `query:poll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<PollState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryPayload>,
}

impl PollResponse {
    /// Check whether another poll is needed.
    ///
    /// A missing state counts as finished.
    pub fn is_pending(&self) -> bool {
        self.result.is_none() && self.state.as_ref().is_some_and(PollState::is_pending)
    }
}

/// Usage figures extracted from result metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanMetadata {
    pub scanned_bytes: Option<u64>,
    pub scanned_records: Option<u64>,
    pub sampled: Option<bool>,
}

impl ScanMetadata {
    /// Extract usage figures from a result's `metadata` object.
    ///
    /// Each field is looked up in `metadata.grail` first, then at the top
    /// level, trying the camelCase name before the snake_case one. Counts may
    /// be integers or finite non-negative floats (rounded); anything else is
    /// ignored.
    pub fn from_metadata(metadata: Option<&Value>) -> Self {
        let Some(metadata) = metadata.and_then(Value::as_object) else {
            return Self::default();
        };
        let scopes: Vec<&Map<String, Value>> = metadata
            .get("grail")
            .and_then(Value::as_object)
            .into_iter()
            .chain(std::iter::once(metadata))
            .collect();

        Self {
            scanned_bytes: count(
                lookup(&scopes, &["scannedBytes", "scanned_bytes"]),
                "scanned_bytes",
            ),
            scanned_records: count(
                lookup(&scopes, &["scannedRecords", "scanned_records"]),
                "scanned_records",
            ),
            sampled: lookup(&scopes, &["sampled"]).and_then(Value::as_bool),
        }
    }
}

fn count(value: Option<&Value>, field: &str) -> Option<u64> {
    let value = value?;
    let count = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f.round() as u64)
    });
    if count.is_none() {
        debug!(field, value = %value, "Ignoring invalid scan metadata value");
    }
    count
}

fn lookup<'a>(scopes: &[&'a Map<String, Value>], names: &[&str]) -> Option<&'a Value> {
    scopes
        .iter()
        .copied()
        .flat_map(|scope| names.iter().filter_map(move |name| scope.get(*name)))
        .find(|value| !value.is_null())
}

/// Outcome of one query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// `None` when the query produced no result.
    pub records: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_state: Option<BudgetState>,
}

impl QueryResult {
    /// Result of a query that produced nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from a response payload, without budget information.
    pub fn from_payload(payload: QueryPayload) -> Self {
        let scan = ScanMetadata::from_metadata(payload.metadata.as_ref());
        Self {
            records: Some(payload.records),
            types: payload.types,
            scanned_bytes: scan.scanned_bytes,
            scanned_records: scan.scanned_records,
            sampled: scan.sampled,
            budget_warning: None,
            budget_state: None,
        }
    }
}

/// Response of `query:verify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default)]
    pub notifications: Vec<VerifyNotification>,
}

/// A message attached to a verify response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyNotification {
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_position: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_request_serialization() {
        let request = ExecuteRequest::new("fetch logs").with_max_result_records(10);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json, json!({ "query": "fetch logs", "maxResultRecords": 10 }));
    }

    #[test]
    fn test_poll_state_round_trips_unknown() {
        let state: PollState = serde_json::from_value(json!("RUNNING")).unwrap();
        assert_eq!(state, PollState::Running);
        assert!(state.is_pending());

        let state: PollState = serde_json::from_value(json!("RESULT_GONE")).unwrap();
        assert_eq!(state, PollState::Other("RESULT_GONE".into()));
        assert!(!state.is_pending());
        assert_eq!(serde_json::to_value(&state).unwrap(), json!("RESULT_GONE"));
    }

    #[test]
    fn test_submit_response_with_token() {
        let response: SubmitResponse = serde_json::from_value(json!({
            "state": "RUNNING",
            "requestToken": "tok-1",
            "ttlSeconds": 60
        }))
        .unwrap();

        assert_eq!(response.request_token.as_deref(), Some("tok-1"));
        assert_eq!(response.state, Some(PollState::Running));
        assert!(response.result.is_none());
    }

    #[test]
    fn test_submit_response_without_state() {
        let response: SubmitResponse = serde_json::from_value(json!({})).unwrap();

        assert!(response.state.is_none());
        assert!(response.request_token.is_none());
        assert!(response.result.is_none());
    }

    #[test]
    fn test_poll_response_pending() {
        let running: PollResponse =
            serde_json::from_value(json!({ "state": "RUNNING", "progress": 40 })).unwrap();
        assert!(running.is_pending());

        let no_state: PollResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!no_state.is_pending());
    }

    #[test]
    fn test_scan_metadata_prefers_grail_scope() {
        let metadata = json!({
            "scannedBytes": 1,
            "grail": { "scannedBytes": 2_000_000_000_u64, "scannedRecords": 7, "sampled": true }
        });

        let scan = ScanMetadata::from_metadata(Some(&metadata));
        assert_eq!(scan.scanned_bytes, Some(2_000_000_000));
        assert_eq!(scan.scanned_records, Some(7));
        assert_eq!(scan.sampled, Some(true));
    }

    #[test]
    fn test_scan_metadata_aliases() {
        let metadata = json!({
            "grail": { "scanned_bytes": 42 },
            "scanned_records": 3
        });

        let scan = ScanMetadata::from_metadata(Some(&metadata));
        assert_eq!(scan.scanned_bytes, Some(42));
        assert_eq!(scan.scanned_records, Some(3));
        assert_eq!(scan.sampled, None);

        let metadata = json!({ "grail": { "scannedBytes": 2.0e9, "scanned_records": 12.0 } });
        let scan = ScanMetadata::from_metadata(Some(&metadata));
        assert_eq!(scan.scanned_bytes, Some(2_000_000_000));
        assert_eq!(scan.scanned_records, Some(12));
    }

    #[test]
    fn test_scan_metadata_drops_invalid_values() {
        let metadata = json!({ "grail": { "scannedBytes": -5, "scannedRecords": "many" } });

        let scan = ScanMetadata::from_metadata(Some(&metadata));
        assert_eq!(scan, ScanMetadata::default());
        assert_eq!(ScanMetadata::from_metadata(None), ScanMetadata::default());
    }

    #[test]
    fn test_query_result_from_payload() {
        let payload: QueryPayload = serde_json::from_value(json!({
            "records": [{ "a": 1 }],
            "types": [],
            "metadata": { "grail": { "scannedBytes": 100 } }
        }))
        .unwrap();

        let result = QueryResult::from_payload(payload);
        assert_eq!(result.records.as_ref().map(Vec::len), Some(1));
        assert_eq!(result.scanned_bytes, Some(100));
        assert!(QueryResult::empty().records.is_none());
    }

    #[test]
    fn test_verify_response() {
        let response: VerifyResponse = serde_json::from_value(json!({
            "valid": false,
            "notifications": [{ "severity": "ERROR", "message": "unknown command" }]
        }))
        .unwrap();

        assert!(!response.valid);
        assert_eq!(response.notifications[0].severity.as_deref(), Some("ERROR"));
    }
}
