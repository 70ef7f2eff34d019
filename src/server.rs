//! MCP server surface over stdio.
//!
//! Exposes the consolidated parser tools plus two utility tools
//! (`list_parsers`, `check_limits`). Terminal errors from a tool invocation
//! are converted into a structured error payload at this boundary; a failed
//! call never ends the process.

use std::time::Duration;

use anyhow::Result;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, InitializeRequestParam,
        InitializeResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::bridge::TaskBridge;
use crate::registry::ParserRegistry;
use crate::tools::{self, TOOL_CATEGORIES, ToolCategory};

pub const TOOL_LIST_PARSERS: &str = "list_parsers";
pub const TOOL_CHECK_LIMITS: &str = "check_limits";

/// Default wall-clock budget for one tool invocation.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Arguments for the no-input utility tools.
#[derive(Debug, Deserialize, JsonSchema)]
struct PlaceholderArgs {
    /// Placeholder. Always pass true.
    #[allow(dead_code)]
    _placeholder: bool,
}

/// Helper to build a schema from an Args type.
fn build_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null)
}

fn utility_tool(name: &'static str, description: &'static str) -> Tool {
    let schema = match build_schema::<PlaceholderArgs>() {
        Value::Object(obj) => std::sync::Arc::new(obj),
        _ => std::sync::Arc::new(serde_json::Map::new()),
    };

    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: schema,
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn text_result(payload: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// MCP server bridging tool calls to the remote parser queue.
#[derive(Clone)]
pub struct GatewayServer {
    registry: ParserRegistry,
    bridge: TaskBridge,
    api: ApiClient,
}

impl GatewayServer {
    pub fn new(api: ApiClient, registry: ParserRegistry, bridge: TaskBridge) -> Self {
        Self {
            registry,
            bridge,
            api,
        }
    }

    /// Serve over stdio until the transport closes or shutdown is signaled.
    pub async fn serve_stdio(self, shutdown: CancellationToken) -> Result<()> {
        let registry = self.registry.clone();

        let service = self.serve(stdio()).await.inspect_err(|e| {
            log::error!("serving error: {e:?}");
        })?;

        // Pre-fetch so the first list_tools does not pay for the fetch.
        let parsers = registry.get_parsers().await;
        log::info!("Server ready on stdio transport ({} parsers)", parsers.len());

        tokio::select! {
            result = service.waiting() => {
                result?;
                log::info!("Stdio transport closed");
            }
            () = shutdown.cancelled() => {
                // In-flight polls are abandoned; the remote tasks keep
                // running with no reader.
                log::info!("Received interrupt signal, shutting down...");
            }
        }

        Ok(())
    }

    async fn dispatch(&self, name: &str, args: &serde_json::Map<String, Value>) -> Result<CallToolResult> {
        if name == TOOL_LIST_PARSERS {
            return self.handle_list_parsers().await;
        }
        if name == TOOL_CHECK_LIMITS {
            return self.handle_check_limits().await;
        }
        if let Some(tool) = tools::find_tool(name) {
            return self.handle_parser_tool(tool, args).await;
        }

        anyhow::bail!(
            "Unknown tool: {name}. Available: {}, {TOOL_LIST_PARSERS}, {TOOL_CHECK_LIMITS}",
            TOOL_CATEGORIES
                .iter()
                .map(|t| t.id)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    async fn handle_parser_tool(
        &self,
        tool: &ToolCategory,
        args: &serde_json::Map<String, Value>,
    ) -> Result<CallToolResult> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Query parameter is required"))?;

        // Caller-supplied numbers can be negative, non-finite, or beyond
        // Duration's range; anything unusable degrades to the default budget.
        let timeout = args
            .get("timeout")
            .and_then(Value::as_f64)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|budget| !budget.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let engine = args
            .get("engine")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| tools::default_engine(tool.id));

        log::info!(
            "Executing {} with engine={engine}, query: {}...",
            tool.id,
            query.chars().take(50).collect::<String>()
        );

        let result = self.bridge.execute(&engine, query, timeout).await?;
        Ok(text_result(&serde_json::to_value(&result)?))
    }

    async fn handle_list_parsers(&self) -> Result<CallToolResult> {
        let parsers = self.registry.get_parsers().await;
        let categories = self.registry.get_categories().await;

        // Group the catalog by consolidated tool.
        let mut tool_mapping = serde_json::Map::new();
        for tool in TOOL_CATEGORIES {
            let engines = tools::parsers_for_tool(tool.id, &parsers);
            if !engines.is_empty() {
                tool_mapping.insert(
                    tool.id.to_string(),
                    json!({
                        "tool": tool.name,
                        "parsers": engines.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
                    }),
                );
            }
        }

        Ok(text_result(&json!({
            "total": parsers.len(),
            "consolidated_tools": TOOL_CATEGORIES.len(),
            "categories": categories,
            "tool_mapping": tool_mapping,
        })))
    }

    async fn handle_check_limits(&self) -> Result<CallToolResult> {
        log::info!("Checking API key rate limits...");
        let limits = self.api.check_limits().await?;

        let message = if limits.minute.remaining > 0 {
            format!(
                "OK: {} requests remaining this minute",
                limits.minute.remaining
            )
        } else {
            format!(
                "Warning: Rate limit reached. Resets in {}s",
                limits.minute.resets_in
            )
        };

        Ok(text_result(&json!({
            "key_id": limits.key_id,
            "name": limits.name,
            "status": limits.status,
            "minute": {
                "used": limits.minute.used,
                "limit": limits.minute.limit,
                "remaining": limits.minute.remaining,
                "resets_in_seconds": limits.minute.resets_in,
            },
            "day": {
                "used": limits.day.used,
                "limit": limits.day.limit,
                "remaining": limits.day.remaining,
                "date": limits.day.date,
            },
            "message": message,
        })))
    }
}

impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Scrapegate - remote scraping parsers (search, AI chat, social, video, translation, extraction) exposed as consolidated MCP tools".to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let parsers = self.registry.get_parsers().await;
        let mut tool_list = Vec::new();

        for tool in TOOL_CATEGORIES {
            let engines: Vec<String> = tools::parsers_for_tool(tool.id, &parsers)
                .iter()
                .map(|p| p.id.clone())
                .collect();
            // Empty intersection omits the tool from this listing; it
            // reappears once the dynamic catalog grows a matching parser.
            if !engines.is_empty() {
                tool_list.push(tools::build_tool(tool, &engines));
            }
        }

        tool_list.push(utility_tool(
            TOOL_LIST_PARSERS,
            "List all available parsers with their categories",
        ));
        tool_list.push(utility_tool(
            TOOL_CHECK_LIMITS,
            "Check current rate limit status for your API key. Returns used/remaining requests for minute and day windows.",
        ));

        log::info!(
            "Registered {} consolidated tools ({} parsers available)",
            tool_list.len(),
            parsers.len()
        );

        Ok(ListToolsResult::with_all_items(tool_list))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_name = request.name.clone();
        let args = request.arguments.unwrap_or_default();

        match self.dispatch(&tool_name, &args).await {
            Ok(result) => Ok(result),
            Err(err) => {
                log::error!("Tool execution error: {err:#}");

                let payload = json!({
                    "error": format!("{err:#}"),
                    "tool": tool_name,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                });
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                Ok(CallToolResult::error(vec![Content::text(text)]))
            }
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
