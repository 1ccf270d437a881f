//! Helper functions for creating test fixtures.
//!
//! Provides convenience functions for building query payloads and the
//! execute/poll responses the query API returns.

use dynatrace_grail::{PollResponse, PollState, QueryPayload, SubmitResponse};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Load environment variables from the project root `.env` file.
///
/// Walks up from `CARGO_MANIFEST_DIR` to the workspace `Cargo.toml`, then
/// loads `.env` from that directory. Variables already set in the environment
/// are not overwritten.
pub fn try_load_dotenv() {
    let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let mut path = PathBuf::from(manifest_dir);
    loop {
        let is_workspace = std::fs::read_to_string(path.join("Cargo.toml"))
            .map(|contents| contents.contains("[workspace]"))
            .unwrap_or(false);
        if is_workspace {
            break;
        }
        if !path.pop() {
            return;
        }
    }

    let Ok(contents) = std::fs::read_to_string(path.join(".env")) else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// Check whether a live Dynatrace environment is configured.
pub fn has_live_environment() -> bool {
    try_load_dotenv();
    std::env::var("DT_ENVIRONMENT").is_ok()
}

/// Create a payload with one record that reports `scanned_bytes` in `metadata.grail`.
pub fn payload_with_scan(scanned_bytes: u64) -> QueryPayload {
    payload_with_metadata(
        vec![json!({ "content": "log line" })],
        json!({ "grail": { "scannedBytes": scanned_bytes, "scannedRecords": 1, "sampled": false } }),
    )
}

/// Create a payload with the given records and raw metadata.
pub fn payload_with_metadata(records: Vec<Value>, metadata: Value) -> QueryPayload {
    QueryPayload {
        records,
        types: None,
        metadata: Some(metadata),
    }
}

/// Create a submit response that carries the result directly.
pub fn submit_with_result(payload: QueryPayload) -> SubmitResponse {
    SubmitResponse {
        state: Some(PollState::Succeeded),
        request_token: None,
        ttl_seconds: None,
        result: Some(payload),
    }
}

/// Create a submit response that asks the caller to poll `token`.
pub fn submit_with_token(token: &str) -> SubmitResponse {
    SubmitResponse {
        state: Some(PollState::Running),
        request_token: Some(token.to_string()),
        ttl_seconds: Some(300),
        result: None,
    }
}

/// Create an empty submit response.
pub fn submit_empty() -> SubmitResponse {
    SubmitResponse {
        state: None,
        request_token: None,
        ttl_seconds: None,
        result: None,
    }
}

/// Create a poll response in the given state without a result.
pub fn poll_state(state: PollState) -> PollResponse {
    PollResponse {
        state: Some(state),
        progress: None,
        result: None,
    }
}

/// Create a poll response for a still running query.
pub fn poll_running() -> PollResponse {
    poll_state(PollState::Running)
}

/// Create a poll response that carries the result.
pub fn poll_with_result(payload: QueryPayload) -> PollResponse {
    PollResponse {
        state: Some(PollState::Succeeded),
        progress: Some(100),
        result: Some(payload),
    }
}
