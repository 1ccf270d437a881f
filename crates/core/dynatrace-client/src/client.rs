//! HTTP client for a Dynatrace platform environment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dynatrace_grail::{
    ExecuteRequest, GrailResult, PollResponse, QueryService, SubmitResponse, VerifyResponse,
};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::env::{Credentials, DynatraceEnv};
use crate::error::{ClientError, ClientResult};
use crate::models::{Entity, Problem, ProblemList, SecurityProblem, SecurityProblemList, Workflow};
use crate::scopes;
use crate::user_agent::user_agent;

/// Default HTTP timeout for platform requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const QUERY_API: &str = "/platform/storage/query/v1";
const CLASSIC_API: &str = "/platform/classic/environment-api/v2";
const AUTOMATION_API: &str = "/platform/automation/v1";

/// Page size for problem and vulnerability listings.
const LIST_PAGE_SIZE: &str = "100";

/// Vulnerabilities below this risk score are not listed.
const VULNERABILITY_SELECTOR: &str = "minRiskScore(\"8.0\")";

/// Error body of the platform APIs: `{"error": {"code": .., "message": ..}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for one Dynatrace environment.
#[derive(Clone)]
pub struct DynatraceClient {
    /// HTTP client
    http: Client,
    /// Environment URL, without trailing slash
    base_url: String,
    auth: Arc<Authenticator>,
}

impl DynatraceClient {
    /// Create a client for a validated environment.
    pub fn new(env: &DynatraceEnv) -> ClientResult<Self> {
        Self::with_endpoints(&env.environment_url, &env.credentials, env.sso_url())
    }

    /// Create a client with explicit environment and SSO URLs.
    pub fn with_endpoints(
        base_url: &str,
        credentials: &Credentials,
        sso_url: &str,
    ) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|e| ClientError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            auth: Arc::new(Authenticator::new(credentials, sso_url, http.clone())),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Environment URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        scopes: &[&str],
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Sending platform request");

        let token = self.auth.bearer_token(scopes).await?;
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or(body);
            warn!(status, url = %url, "Platform request failed");
            return Err(ClientError::Http { status, message });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("failed to parse {}: {}", path, e)))
    }

    /// Get information about the environment (tenant).
    pub async fn environment_info(&self) -> ClientResult<Value> {
        self.send(
            Method::GET,
            "/platform/management/v1/environment",
            scopes::ENVIRONMENT_INFO,
            &[],
            None,
        )
        .await
    }

    /// List problems.
    pub async fn list_problems(&self) -> ClientResult<Vec<Problem>> {
        let list: ProblemList = self
            .send(
                Method::GET,
                &format!("{}/problems", CLASSIC_API),
                scopes::PROBLEMS,
                &[("pageSize", LIST_PAGE_SIZE)],
                None,
            )
            .await?;
        Ok(list.problems)
    }

    /// Get a problem with evidence and affected entities.
    pub async fn problem_details(&self, problem_id: &str) -> ClientResult<Problem> {
        self.send(
            Method::GET,
            &format!("{}/problems/{}", CLASSIC_API, problem_id),
            scopes::PROBLEMS,
            &[("fields", "evidenceDetails,affectedEntities")],
            None,
        )
        .await
    }

    /// List high-risk vulnerabilities, highest risk first.
    pub async fn list_security_problems(&self) -> ClientResult<Vec<SecurityProblem>> {
        let list: SecurityProblemList = self
            .send(
                Method::GET,
                &format!("{}/securityProblems", CLASSIC_API),
                scopes::SECURITY_PROBLEMS,
                &[
                    ("sort", "-riskAssessment.riskScore"),
                    ("pageSize", LIST_PAGE_SIZE),
                    ("securityProblemSelector", VULNERABILITY_SELECTOR),
                ],
                None,
            )
            .await?;
        Ok(list.security_problems)
    }

    /// Get a vulnerability with its affected entities and entry points.
    pub async fn security_problem_details(
        &self,
        security_problem_id: &str,
    ) -> ClientResult<SecurityProblem> {
        self.send(
            Method::GET,
            &format!("{}/securityProblems/{}", CLASSIC_API, security_problem_id),
            scopes::SECURITY_PROBLEMS,
            &[(
                "fields",
                "+riskAssessment,+affectedEntities,+exposedEntities,+entryPoints,+codeLevelVulnerabilityDetails,+description,+remediationDescription",
            )],
            None,
        )
        .await
    }

    /// Get a monitored entity.
    pub async fn entity_details(&self, entity_id: &str) -> ClientResult<Entity> {
        self.send(
            Method::GET,
            &format!("{}/entities/{}", CLASSIC_API, entity_id),
            scopes::ENTITIES,
            &[],
            None,
        )
        .await
    }

    /// Create a workflow.
    pub async fn create_workflow(&self, workflow: &Value) -> ClientResult<Workflow> {
        self.send(
            Method::POST,
            &format!("{}/workflows", AUTOMATION_API),
            scopes::WORKFLOWS,
            &[],
            Some(workflow),
        )
        .await
    }

    /// Apply a partial update to a workflow.
    pub async fn update_workflow(
        &self,
        workflow_id: &str,
        patch: &Value,
    ) -> ClientResult<Workflow> {
        self.send(
            Method::PATCH,
            &format!("{}/workflows/{}", AUTOMATION_API, workflow_id),
            scopes::WORKFLOWS,
            &[],
            Some(patch),
        )
        .await
    }

    /// Call an app function, e.g. `dynatrace.slack` / `slack-send-message`.
    pub async fn call_app_function(
        &self,
        app_id: &str,
        function_name: &str,
        payload: &Value,
        scopes: &[&str],
    ) -> ClientResult<Value> {
        debug!(app_id, function_name, "Calling app function");
        self.send(
            Method::POST,
            &format!(
                "/platform/app-engine/app-functions/v1/apps/{}/api/{}",
                app_id, function_name
            ),
            scopes,
            &[],
            Some(payload),
        )
        .await
    }

    /// Check a DQL statement without running it.
    pub async fn verify_dql(&self, query: &str) -> ClientResult<VerifyResponse> {
        self.send(
            Method::POST,
            &format!("{}/query:verify", QUERY_API),
            scopes::VERIFY_DQL,
            &[],
            Some(&json!({ "query": query })),
        )
        .await
    }

    /// Submit a DQL query.
    pub async fn execute_query(
        &self,
        request: &ExecuteRequest,
        scopes: &[&str],
    ) -> ClientResult<SubmitResponse> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::InvalidResponse(format!("failed to encode query: {}", e)))?;
        self.send(
            Method::POST,
            &format!("{}/query:execute", QUERY_API),
            scopes,
            &[],
            Some(&body),
        )
        .await
    }

    /// Poll a running DQL query.
    pub async fn poll_query(
        &self,
        request_token: &str,
        scopes: &[&str],
    ) -> ClientResult<PollResponse> {
        self.send(
            Method::GET,
            &format!("{}/query:poll", QUERY_API),
            scopes,
            &[("request-token", request_token)],
            None,
        )
        .await
    }

    /// Query service that authenticates with `scopes`.
    pub fn query_service(&self, scopes: &'static [&'static str]) -> GrailQueryService {
        GrailQueryService {
            client: self.clone(),
            scopes,
        }
    }
}

impl std::fmt::Debug for DynatraceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynatraceClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish()
    }
}

/// [`QueryService`] backed by the Grail storage query API.
#[derive(Debug, Clone)]
pub struct GrailQueryService {
    client: DynatraceClient,
    scopes: &'static [&'static str],
}

#[async_trait]
impl QueryService for GrailQueryService {
    async fn submit(&self, request: &ExecuteRequest) -> GrailResult<SubmitResponse> {
        Ok(self.client.execute_query(request, self.scopes).await?)
    }

    async fn poll(&self, request_token: &str) -> GrailResult<PollResponse> {
        Ok(self.client.poll_query(request_token, self.scopes).await?)
    }
}
