//! Integration tests for DynatraceClient against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use dynatrace_client::{scopes, ClientError, Credentials, DynatraceClient};
use dynatrace_grail::{BudgetLimit, BudgetRegistry, ExecuteRequest, ExecutorConfig, QueryExecutor};
use httpmock::prelude::*;
use serde_json::json;

fn token_client(server: &MockServer) -> DynatraceClient {
    DynatraceClient::with_endpoints(
        &server.base_url(),
        &Credentials::PlatformToken("dt0s16.test".into()),
        &server.base_url(),
    )
    .unwrap()
}

fn oauth_client(server: &MockServer) -> DynatraceClient {
    DynatraceClient::with_endpoints(
        &server.base_url(),
        &Credentials::OAuthClient {
            client_id: "dt0s02.client".into(),
            client_secret: "secret".into(),
        },
        &server.base_url(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_platform_token_and_user_agent_headers() {
    let server = MockServer::start_async().await;
    let env_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/platform/management/v1/environment")
                .header("authorization", "Bearer dt0s16.test")
                .header_exists("user-agent");
            then.status(200)
                .json_body(json!({ "environmentId": "abc123", "state": "ACTIVE" }));
        })
        .await;

    let info = token_client(&server).environment_info().await.unwrap();

    env_mock.assert_async().await;
    assert_eq!(info["environmentId"], "abc123");
}

#[tokio::test]
async fn test_oauth_token_is_cached_per_scope_set() {
    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/sso/oauth2/token")
                .body_contains("grant_type=client_credentials")
                .body_contains("client_id=dt0s02.client");
            then.status(200).json_body(json!({
                "access_token": "oauth-token",
                "token_type": "Bearer",
                "expires_in": 300
            }));
        })
        .await;
    let problems_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/platform/classic/environment-api/v2/problems")
                .query_param("pageSize", "100")
                .header("authorization", "Bearer oauth-token");
            then.status(200).json_body(json!({
                "totalCount": 1,
                "problems": [{ "problemId": "p-1", "displayId": "P-1", "title": "CPU saturation" }]
            }));
        })
        .await;

    let client = oauth_client(&server);
    let first = client.list_problems().await.unwrap();
    let second = client.list_problems().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second[0].title, "CPU saturation");
    problems_mock.assert_hits_async(2).await;
    token_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_oauth_error_body_becomes_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/sso/oauth2/token");
            then.status(400).json_body(json!({
                "error": "invalid_scope",
                "error_description": "scope not allowed",
                "issueId": "issue-9"
            }));
        })
        .await;

    let err = oauth_client(&server).environment_info().await.unwrap_err();

    match err {
        ClientError::Auth {
            error, issue_id, ..
        } => {
            assert_eq!(error.as_deref(), Some("invalid_scope"));
            assert_eq!(issue_id.as_deref(), Some("issue-9"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_maps_to_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/platform/classic/environment-api/v2/entities/HOST-1");
            then.status(403)
                .json_body(json!({ "error": { "code": 403, "message": "Token is missing scope" } }));
        })
        .await;

    let err = token_client(&server).entity_details("HOST-1").await.unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert_eq!(
        err.to_string(),
        "Client Request Error: Token is missing scope (403)"
    );
}

#[tokio::test]
async fn test_security_problems_query_parameters() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/platform/classic/environment-api/v2/securityProblems")
                .query_param("sort", "-riskAssessment.riskScore")
                .query_param("securityProblemSelector", "minRiskScore(\"8.0\")");
            then.status(200).json_body(json!({
                "securityProblems": [{
                    "securityProblemId": "42",
                    "displayId": "S-42",
                    "title": "Log4Shell",
                    "cveIds": ["CVE-2021-44228"]
                }]
            }));
        })
        .await;

    let problems = token_client(&server).list_security_problems().await.unwrap();

    mock.assert_async().await;
    assert_eq!(problems[0].cve_ids, vec!["CVE-2021-44228"]);
}

#[tokio::test]
async fn test_verify_dql() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/platform/storage/query/v1/query:verify")
                .json_body(json!({ "query": "fetch logs" }));
            then.status(200).json_body(json!({ "valid": true, "notifications": [] }));
        })
        .await;

    let response = token_client(&server).verify_dql("fetch logs").await.unwrap();
    assert!(response.valid);
}

#[tokio::test]
async fn test_executor_over_http_polls_and_charges_budget() {
    let server = MockServer::start_async().await;
    let execute_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/platform/storage/query/v1/query:execute")
                .json_body_partial(r#"{ "query": "fetch logs | limit 1" }"#);
            then.status(202)
                .json_body(json!({ "state": "RUNNING", "requestToken": "tok-http", "ttlSeconds": 120 }));
        })
        .await;
    let poll_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/platform/storage/query/v1/query:poll")
                .query_param("request-token", "tok-http");
            then.status(200).json_body(json!({
                "state": "SUCCEEDED",
                "progress": 100,
                "result": {
                    "records": [{ "content": "hello" }],
                    "types": [],
                    "metadata": { "grail": { "scannedBytes": 2_000_000_000_u64, "scannedRecords": 1 } }
                }
            }));
        })
        .await;

    let client = token_client(&server);
    let budget = Arc::new(BudgetRegistry::new());
    let executor = QueryExecutor::with_config(
        Arc::new(client.query_service(scopes::EXECUTE_DQL)),
        Arc::clone(&budget),
        ExecutorConfig {
            poll_interval: Duration::from_millis(10),
            ..ExecutorConfig::default()
        },
    );
    let limit = BudgetLimit::from_gb(10.0).unwrap();

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs | limit 1"), Some(limit))
        .await
        .unwrap();

    execute_mock.assert_async().await;
    poll_mock.assert_async().await;
    assert_eq!(result.scanned_bytes, Some(2_000_000_000));
    assert_eq!(budget.budget_status(limit).usage_percentage, Some(20.0));
}

#[tokio::test]
async fn test_executor_empty_submit_body_is_empty_result() {
    let server = MockServer::start_async().await;
    let execute_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/platform/storage/query/v1/query:execute");
            then.status(200).json_body(json!({}));
        })
        .await;
    let poll_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/platform/storage/query/v1/query:poll");
            then.status(200).json_body(json!({ "state": "RUNNING" }));
        })
        .await;

    let client = token_client(&server);
    let budget = Arc::new(BudgetRegistry::new());
    let executor = QueryExecutor::new(
        Arc::new(client.query_service(scopes::EXECUTE_DQL)),
        Arc::clone(&budget),
    );
    let limit = BudgetLimit::from_gb(10.0).unwrap();

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit))
        .await
        .unwrap();

    execute_mock.assert_async().await;
    assert_eq!(poll_mock.hits_async().await, 0);
    assert!(result.records.is_none());
    assert_eq!(budget.budget_status(limit).total_bytes_scanned, 0);
}

#[tokio::test]
async fn test_executor_charges_float_scanned_bytes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/platform/storage/query/v1/query:execute");
            then.status(200).json_body(json!({
                "state": "SUCCEEDED",
                "result": {
                    "records": [],
                    "metadata": { "grail": { "scannedBytes": 2.0e9 } }
                }
            }));
        })
        .await;

    let client = token_client(&server);
    let budget = Arc::new(BudgetRegistry::new());
    let executor = QueryExecutor::new(
        Arc::new(client.query_service(scopes::EXECUTE_DQL)),
        Arc::clone(&budget),
    );
    let limit = BudgetLimit::from_gb(10.0).unwrap();

    let result = executor
        .execute(&ExecuteRequest::new("fetch logs"), Some(limit))
        .await
        .unwrap();

    assert_eq!(result.scanned_bytes, Some(2_000_000_000));
    assert_eq!(budget.budget_status(limit).usage_percentage, Some(20.0));
}

#[tokio::test]
async fn test_app_function_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/platform/app-engine/app-functions/v1/apps/dynatrace.ownership/api/get-ownership-from-entity")
                .json_body(json!({ "entityIds": "SERVICE-1" }));
            then.status(200)
                .json_body(json!({ "result": { "owners": [{ "name": "team-a" }] } }));
        })
        .await;

    let response = token_client(&server)
        .call_app_function(
            "dynatrace.ownership",
            "get-ownership-from-entity",
            &json!({ "entityIds": "SERVICE-1" }),
            scopes::OWNERSHIP,
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response["result"]["owners"][0]["name"], "team-a");
}
