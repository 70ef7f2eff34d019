//! Runtime configuration assembled from the CLI and environment.

use std::time::Duration;

use crate::api::API_KEY_PREFIX;
use crate::cli::Cli;

/// Environment flag that disables dynamic catalog loading when set to the
/// literal string "false".
pub const DYNAMIC_PARSERS_VAR: &str = "DYNAMIC_PARSERS";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: Option<String>,
    pub enable_dynamic: bool,
    pub cache_ttl: Duration,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            api_url: cli.api_url.clone(),
            api_key: cli.api_key.clone(),
            enable_dynamic: !cli.static_only && dynamic_enabled_in_env(),
            cache_ttl: Duration::from_secs(cli.cache_ttl),
        }
    }

    /// Advisory key-format check at startup. A missing or legacy-format key
    /// is warned about but never blocks operation.
    pub fn validate_api_key(&self) {
        match self.api_key.as_deref() {
            None => {
                log::warn!("REDIS_API_KEY not set. Task submission and limit checks will fail.");
            }
            Some(key) if !key.starts_with(API_KEY_PREFIX) => {
                log::warn!(
                    "API key does not match expected format '{API_KEY_PREFIX}*'. \
                     Legacy keys are deprecated."
                );
            }
            Some(_) => {}
        }
    }
}

fn dynamic_enabled_in_env() -> bool {
    std::env::var(DYNAMIC_PARSERS_VAR)
        .map(|value| value != "false")
        .unwrap_or(true)
}
