//! HTTP client for the remote control-plane and queue backend.
//!
//! All remote traffic goes through [`ApiClient`]: catalog and options reads
//! from the control-plane, task pushes and result reads against the
//! queue backend, and rate-limit introspection. Authentication is a single
//! `X-API-Key` header; there is no token exchange.

use std::collections::HashMap;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::catalog::ParserDescriptor;

/// Queue the execution backend consumes tasks from; result slots are keyed
/// `<queue>:<task_id>`.
pub const QUEUE_NAME: &str = "aparser_redis_api";

/// Expected prefix of issued API keys. Legacy keys without it still work.
pub const API_KEY_PREFIX: &str = "ayga_live_";

pub const HEADER_API_KEY: &str = "X-API-Key";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Authenticated operation attempted without a configured key. Raised
    /// before any network call.
    #[error("REDIS_API_KEY is required for this operation")]
    MissingApiKey,

    #[error("{context} failed ({status}): {body}")]
    UnexpectedStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Row of the control-plane `/parsers` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteParser {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub aparser_name: String,
    pub enabled: Option<bool>,
}

impl From<RemoteParser> for ParserDescriptor {
    fn from(remote: RemoteParser) -> Self {
        ParserDescriptor {
            id: remote.id,
            name: remote.name,
            category: remote.category,
            description: remote.description,
            remote_name: remote.aparser_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParserListResponse {
    pub parsers: Vec<RemoteParser>,
    #[allow(dead_code)]
    pub count: Option<u64>,
    #[allow(dead_code)]
    pub categories: Option<Vec<String>>,
}

/// Per-parser operational overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserOptions {
    pub parser_id: String,
    pub timeout: u64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Process-wide fallbacks applied when no per-parser override exists.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultOptions {
    pub timeout: u64,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self {
            timeout: 60,
            proxy: None,
            user_agent: None,
        }
    }
}

impl DefaultOptions {
    /// Synthesize options for a parser with no override: defaults merged
    /// with the requested id and `enabled = true`.
    pub fn for_parser(&self, parser_id: &str) -> ParserOptions {
        ParserOptions {
            parser_id: parser_id.to_string(),
            timeout: self.timeout,
            enabled: true,
            proxy: self.proxy.clone(),
            user_agent: self.user_agent.clone(),
            custom_params: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParserOptionsResponse {
    pub defaults: Option<DefaultOptions>,
    pub overrides: Option<HashMap<String, ParserOptions>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinuteWindow {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub resets_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWindow {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub date: String,
}

/// Rate-limit status for the configured API key (`GET /me/limits`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub key_id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub minute: MinuteWindow,
    pub day: DayWindow,
}

/// Result slot payload: the queue backend wraps the serialized task result
/// in `{ "value": "<json string>" }`.
#[derive(Debug, Deserialize)]
pub struct ValueEnvelope {
    pub value: String,
}

/// Shared HTTP client for all remote endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Attach the API key, failing fast when none is configured. Used by
    /// every operation that the backend requires auth for.
    fn authed(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        let key = self.api_key.as_deref().ok_or(ApiError::MissingApiKey)?;
        Ok(request.header(HEADER_API_KEY, key))
    }

    /// Attach the API key when present. Catalog reads are allowed without
    /// one; the server decides whether to reject the request.
    fn maybe_authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.header(HEADER_API_KEY, key),
            None => request,
        }
    }

    /// `GET /parsers` - current dynamic catalog.
    pub async fn fetch_parsers(&self) -> Result<ParserListResponse, ApiError> {
        let url = format!("{}/parsers", self.base_url);
        let response = self.maybe_authed(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus {
                context: "parser list fetch",
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// `GET /parsers/options` - per-parser operational overrides.
    pub async fn fetch_options(&self) -> Result<ParserOptionsResponse, ApiError> {
        let url = format!("{}/parsers/options", self.base_url);
        let response = self.maybe_authed(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus {
                context: "parser options fetch",
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// `GET /me/limits` - rate-limit status for the configured key.
    pub async fn check_limits(&self) -> Result<RateLimitStatus, ApiError> {
        let url = format!("{}/me/limits", self.base_url);
        let response = self.authed(self.http.get(&url))?.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus {
                context: "rate limit check",
                status,
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Push one serialized task tuple onto the execution queue.
    pub async fn push_task(&self, task_value: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/structures/list/{}/lpush", self.base_url, QUEUE_NAME);
        let body = serde_json::json!({ "value": task_value });
        Ok(self.authed(self.http.post(&url))?.json(&body).send().await?)
    }

    /// Read the result slot for a task. The raw response is returned so the
    /// poll loop can interpret 404 (pending) and 429 (backpressure) itself.
    pub async fn fetch_result(&self, task_id: &str) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/kv/{}:{}", self.base_url, QUEUE_NAME, task_id);
        Ok(self.authed(self.http.get(&url))?.send().await?)
    }
}
