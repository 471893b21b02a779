use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::auth::Credentials;
use crate::descriptor::Operation;
use crate::error::{RabitError, Result};
use crate::params::{
    HistoryParams, OperationParams, Params, PollParams, QuickDeployParams, RollbackDetailsParams,
    RollbackHistoryParams, RollbackParams, TriggerParams, UpdateParams,
};
use crate::request::PreparedRequest;

#[cfg(test)]
mod tests;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// AutoRABIT v1 reads the API token from this header.
const TOKEN_HEADER: &str = "token";

/// Decoded JSON object returned by every operation.
pub type JsonObject = Map<String, Value>;

/// Client for the AutoRABIT CI jobs API v1.
///
/// Holds one credential set and never mutates after construction, so it can be
/// cloned and shared across tasks. Every call sends exactly one request; nothing
/// is retried, as trigger and rollback are not known to be idempotent.
#[derive(Debug, Clone)]
pub struct CiJobsClient {
    client: Client,
    credentials: Credentials,
    timeout: Duration,
}

impl CiJobsClient {
    /// Creates a client with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero timeout and `Client` when the
    /// HTTP client cannot be built.
    pub fn with_timeout(credentials: Credentials, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(RabitError::validation("timeout", "must be greater than zero"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("rabit-cijobs/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|source| RabitError::Client { source })?;

        Ok(Self {
            client,
            credentials,
            timeout,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches build history of a CI job.
    ///
    /// The response keeps the build list under `ciJobHistoryList`; see
    /// [`crate::status::history_entries`].
    pub async fn history(&self, params: HistoryParams) -> Result<JsonObject> {
        self.call(params).await
    }

    /// Polls the status of a build, or the latest one when no build is given.
    pub async fn poll(&self, params: PollParams) -> Result<JsonObject> {
        self.call(params).await
    }

    /// Triggers a build of a pre-configured CI job.
    pub async fn trigger(&self, params: TriggerParams) -> Result<JsonObject> {
        self.call(params).await
    }

    /// Starts a quick deploy of a previously validated build.
    pub async fn quick_deploy(&self, params: QuickDeployParams) -> Result<JsonObject> {
        self.call(params).await
    }

    /// Sets the baseline revision of a CI job.
    pub async fn update(&self, params: UpdateParams) -> Result<JsonObject> {
        self.call(params).await
    }

    pub async fn rollback(&self, params: RollbackParams) -> Result<JsonObject> {
        self.call(params).await
    }

    pub async fn rollback_details(&self, params: RollbackDetailsParams) -> Result<JsonObject> {
        self.call(params).await
    }

    pub async fn rollback_history(&self, params: RollbackHistoryParams) -> Result<JsonObject> {
        self.call(params).await
    }

    /// Runs any typed parameter set through the gateway.
    pub async fn call<P: OperationParams>(&self, params: P) -> Result<JsonObject> {
        self.execute(P::OPERATION, params.into_params()).await
    }

    /// Validates `params` for `operation`, sends one request and decodes the
    /// JSON object in the response.
    ///
    /// # Errors
    ///
    /// - `Validation` if the parameters do not satisfy the operation; no
    ///   request is sent
    /// - `Transport` on connection, DNS or timeout failures
    /// - `Api` on a non-success status, with the raw body
    /// - `InvalidResponse` if a success body is not a JSON object
    pub async fn execute(&self, operation: Operation, params: Params) -> Result<JsonObject> {
        let request = PreparedRequest::build(&self.credentials, operation, params)?;
        self.send(request).await
    }

    async fn send(&self, request: PreparedRequest) -> Result<JsonObject> {
        let PreparedRequest {
            operation,
            method,
            url,
            query,
            body,
        } = request;

        debug!("{operation}: {method:?} {url}");

        let mut builder = self
            .client
            .request(method.as_reqwest(), url)
            .header(TOKEN_HEADER, self.credentials.token().as_str());
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| RabitError::Transport { operation, source })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| RabitError::Transport { operation, source })?;

        if !status.is_success() {
            warn!("{operation}: AutoRABIT returned status {status}");
            return Err(RabitError::Api {
                operation,
                status: status.as_u16(),
                body: text,
            });
        }

        decode(operation, status.as_u16(), text)
    }
}

fn decode(operation: Operation, status: u16, body: String) -> Result<JsonObject> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(RabitError::InvalidResponse {
            operation,
            status,
            reason: format!("expected a JSON object, got {}", json_type(&other)),
            body,
        }),
        Err(e) => Err(RabitError::InvalidResponse {
            operation,
            status,
            reason: e.to_string(),
            body,
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
