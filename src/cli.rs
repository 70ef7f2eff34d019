//! Command-line interface.

use clap::Parser;

/// Scrapegate MCP server - remote scraping parsers as consolidated tools
///
/// Consolidated tools:
/// - ask_ai: AI chat models (Perplexity, ChatGPT, ...)
/// - search_web: web search engines and trends
/// - get_social: social platform scraping
/// - get_video: YouTube search/details/comments
/// - translate: translation services
/// - extract: article/text/link extraction
#[derive(Parser, Debug)]
#[command(name = "scrapegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the control-plane and queue backend
    #[arg(long, env = "API_URL", default_value = "https://redis.ayga.tech")]
    pub api_url: String,

    /// API key for the remote backend
    ///
    /// Required for task submission and rate-limit checks; catalog reads
    /// work without one.
    #[arg(long, env = "REDIS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Serve the static parser catalog only (no control-plane fetches)
    ///
    /// Equivalent to DYNAMIC_PARSERS=false.
    #[arg(long)]
    pub static_only: bool,

    /// Catalog cache TTL in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    pub cache_ttl: u64,

    /// Print the static parser catalog grouped by category and exit
    #[arg(long)]
    pub list_parsers: bool,
}
