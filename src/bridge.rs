//! Task bridge: submit one unit of remote work and poll for its result.
//!
//! The queue backend has no callback channel, so result delivery is
//! pull-based: `lpush` the task tuple, then read the key-value slot for the
//! task id until it materializes. Protocol conventions honored by the poll
//! loop: 404 means not-ready, 429 means backpressure with a `Retry-After`
//! hint. Everything else non-2xx is terminal.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ApiClient, ApiError, ValueEnvelope};
use crate::registry::ParserRegistry;

/// Profile name sent in every task tuple.
const TASK_PROFILE: &str = "default";

/// Outcome of a remote execution, passed through to the caller unchanged
/// beyond JSON decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: i64,
    #[serde(default)]
    pub info: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Engine id not present in the registry. Terminal before any network
    /// call.
    #[error("Unknown parser: {0}")]
    UnknownParser(String),

    #[error("Task submission failed ({status}): {body}")]
    Submission { status: StatusCode, body: String },

    #[error("Failed to get result ({status}): {body}")]
    PollFailed { status: StatusCode, body: String },

    #[error("Timeout waiting for result after {timeout_secs}s ({attempts} attempts)")]
    TimedOut { timeout_secs: u64, attempts: u32 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Poll loop pacing. Production values match the queue backend's
/// conventions; tests inject millisecond intervals.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between not-ready (404) reads and after transient faults.
    pub poll_interval: Duration,
    /// Backpressure sleep when a 429 carries no usable `Retry-After`.
    pub rate_limit_fallback: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            rate_limit_fallback: Duration::from_secs(5),
        }
    }
}

/// True while the wall-clock budget has not been exhausted.
pub fn budget_remaining(elapsed: Duration, timeout: Duration) -> bool {
    elapsed < timeout
}

/// Bridges tool invocations to the remote queue. Each call generates its
/// own task id and polls independently; concurrent calls never contend.
#[derive(Clone)]
pub struct TaskBridge {
    api: ApiClient,
    registry: ParserRegistry,
    poll: PollConfig,
}

impl TaskBridge {
    pub fn new(api: ApiClient, registry: ParserRegistry) -> Self {
        Self::with_poll_config(api, registry, PollConfig::default())
    }

    pub fn with_poll_config(api: ApiClient, registry: ParserRegistry, poll: PollConfig) -> Self {
        Self {
            api,
            registry,
            poll,
        }
    }

    /// Submit a task for `engine` and wait for its result within `timeout`.
    pub async fn execute(
        &self,
        engine: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<TaskResult, BridgeError> {
        let parser = self
            .registry
            .get_parser_by_id(engine)
            .await
            .ok_or_else(|| BridgeError::UnknownParser(engine.to_string()))?;

        let task_id = Uuid::new_v4().to_string();
        log::info!("Submitting task {task_id} to parser {}", parser.name);

        // Fixed-shape tuple the execution backend expects:
        // [task id, engine name, profile, query, params, options].
        let task_value = serde_json::json!([
            task_id,
            parser.remote_name,
            TASK_PROFILE,
            query,
            {},
            {},
        ])
        .to_string();

        let response = self.api.push_task(&task_value).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Submission { status, body });
        }

        log::info!(
            "Task {task_id} submitted, waiting for result (timeout: {}s)",
            timeout.as_secs()
        );
        self.wait_for_result(&task_id, timeout).await
    }

    /// Poll the result slot until it resolves or the budget elapses.
    async fn wait_for_result(
        &self,
        task_id: &str,
        timeout: Duration,
    ) -> Result<TaskResult, BridgeError> {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        while budget_remaining(start.elapsed(), timeout) {
            attempts += 1;

            let response = match self.api.fetch_result(task_id).await {
                Ok(response) => response,
                Err(err) => {
                    // Transport faults are transient; only the budget ends
                    // the loop.
                    log::debug!("Poll attempt {attempts} failed: {err}, retrying...");
                    tokio::time::sleep(self.poll_interval()).await;
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                match decode_result(response).await {
                    Ok(result) => {
                        log::info!("Task {task_id} completed after {attempts} attempts");
                        return Ok(result);
                    }
                    Err(err) => {
                        // Malformed slot body, same treatment as a
                        // transport fault.
                        log::debug!("Poll attempt {attempts} returned undecodable body: {err}, retrying...");
                        tokio::time::sleep(self.poll_interval()).await;
                        continue;
                    }
                }
            }

            if status == StatusCode::NOT_FOUND {
                // Task not ready yet.
                tokio::time::sleep(self.poll_interval()).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(&response).unwrap_or(self.poll.rate_limit_fallback);
                log::debug!("Rate limited, waiting {}s...", delay.as_secs());
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::PollFailed { status, body });
        }

        Err(BridgeError::TimedOut {
            timeout_secs: timeout.as_secs(),
            attempts,
        })
    }

    fn poll_interval(&self) -> Duration {
        self.poll.poll_interval
    }
}

async fn decode_result(response: reqwest::Response) -> anyhow::Result<TaskResult> {
    let envelope: ValueEnvelope = response.json().await?;
    Ok(serde_json::from_str(&envelope.value)?)
}

/// `Retry-After` header in seconds, when present and parseable.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_remaining() {
        let timeout = Duration::from_secs(60);
        assert!(budget_remaining(Duration::ZERO, timeout));
        assert!(budget_remaining(Duration::from_secs(59), timeout));
        assert!(!budget_remaining(Duration::from_secs(60), timeout));
        assert!(!budget_remaining(Duration::from_secs(61), timeout));
    }

    #[test]
    fn test_task_result_decodes_minimal_body() {
        let result: TaskResult = serde_json::from_str(r#"{"success":1,"info":{}}"#).expect("decodes");
        assert_eq!(result.success, 1);
        assert!(result.info.is_empty());
        assert!(result.sources.is_none());
        assert!(result.data.is_none());
    }

    #[test]
    fn test_task_result_passes_payload_through() {
        let body = r#"{"success":0,"info":{"error":"captcha"},"sources":[{"url":"https://example.com"}],"data":"raw"}"#;
        let result: TaskResult = serde_json::from_str(body).expect("decodes");
        assert_eq!(result.success, 0);
        assert_eq!(result.info["error"], "captcha");
        assert_eq!(result.sources.as_ref().map(Vec::len), Some(1));
    }
}
