//! Consolidated tool surface.
//!
//! Rather than one MCP tool per parser, parsers are grouped into six
//! category-based tools with an optional `engine` parameter. A tool is only
//! listed while at least one of its parser categories is present in the
//! registry's current collection.

use rmcp::model::Tool;
use serde_json::{Value, json};

use crate::catalog::ParserDescriptor;

/// One externally visible tool grouping 1..N parser categories.
#[derive(Debug, Clone)]
pub struct ToolCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Parser categories consolidated under this tool.
    pub categories: &'static [&'static str],
    /// Default parser id when the caller supplies no engine.
    pub default_engine: &'static str,
    /// Environment variable that overrides the default engine per deployment.
    pub default_env_var: &'static str,
    pub query_description: &'static str,
}

pub const TOOL_CATEGORIES: &[ToolCategory] = &[
    ToolCategory {
        id: "ask_ai",
        name: "Ask AI",
        description: "Query AI models like Perplexity, ChatGPT, Google AI, Kimi, DeepAI, Copilot for answers and analysis",
        categories: &["FreeAI"],
        default_engine: "perplexity",
        default_env_var: "DEFAULT_AI_ENGINE",
        query_description: "Question or prompt for the AI model",
    },
    ToolCategory {
        id: "search_web",
        name: "Web Search",
        description: "Search the web using Google, Bing, DuckDuckGo, Yandex, Baidu, Yahoo, Rambler, You.com or get Google Trends data",
        categories: &["SE", "Analytics"],
        default_engine: "google_search",
        default_env_var: "DEFAULT_SEARCH_ENGINE",
        query_description: "Search query",
    },
    ToolCategory {
        id: "get_social",
        name: "Social Media",
        description: "Get data from social platforms: Instagram profiles/posts/tags/geo, TikTok, Reddit posts/comments, Telegram groups, Pinterest",
        categories: &["Social", "Visual"],
        default_engine: "instagram_profile",
        default_env_var: "DEFAULT_SOCIAL_ENGINE",
        query_description: "Username, URL, or search query",
    },
    ToolCategory {
        id: "get_video",
        name: "Video Data",
        description: "Search YouTube videos, get video details, comments, or channel information",
        categories: &["YouTube"],
        default_engine: "youtube_search",
        default_env_var: "DEFAULT_VIDEO_ENGINE",
        query_description: "Search query or video/channel URL",
    },
    ToolCategory {
        id: "translate",
        name: "Translate",
        description: "Translate text using Google Translate, DeepL, Bing, or Yandex",
        categories: &["Translation"],
        default_engine: "google_translate",
        default_env_var: "DEFAULT_TRANSLATION_ENGINE",
        query_description: "Text to translate",
    },
    ToolCategory {
        id: "extract",
        name: "Extract Content",
        description: "Extract text, articles, or links from web pages",
        categories: &["Content"],
        default_engine: "text_extractor",
        default_env_var: "DEFAULT_EXTRACTION_ENGINE",
        query_description: "URL of the web page",
    },
];

pub fn find_tool(tool_id: &str) -> Option<&'static ToolCategory> {
    TOOL_CATEGORIES.iter().find(|t| t.id == tool_id)
}

/// Parsers from `all_parsers` that fall under the given tool's categories.
pub fn parsers_for_tool<'a>(
    tool_id: &str,
    all_parsers: &'a [ParserDescriptor],
) -> Vec<&'a ParserDescriptor> {
    let Some(tool) = find_tool(tool_id) else {
        return Vec::new();
    };
    all_parsers
        .iter()
        .filter(|p| tool.categories.contains(&p.category.as_str()))
        .collect()
}

/// Default engine for a tool: the deployment override from the tool's
/// environment variable when set and non-empty, else the static default.
pub fn default_engine(tool_id: &str) -> String {
    let Some(tool) = find_tool(tool_id) else {
        return String::new();
    };
    match std::env::var(tool.default_env_var) {
        Ok(value) if !value.is_empty() => value,
        _ => tool.default_engine.to_string(),
    }
}

/// Which consolidated tool a parser id belongs to, given the current
/// collection.
pub fn find_tool_for_parser(
    parser_id: &str,
    all_parsers: &[ParserDescriptor],
) -> Option<&'static ToolCategory> {
    let parser = all_parsers.iter().find(|p| p.id == parser_id)?;
    TOOL_CATEGORIES
        .iter()
        .find(|t| t.categories.contains(&parser.category.as_str()))
}

/// Input schema for a consolidated tool: required free-text `query`, an
/// `engine` enum constrained to the currently available ids, and an
/// optional `timeout` override.
pub fn build_input_schema(tool: &ToolCategory, available_engines: &[String]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": tool.query_description,
            },
            "engine": {
                "type": "string",
                "description": format!(
                    "Specific engine to use. Available: {}. Default: {}",
                    available_engines.join(", "),
                    default_engine(tool.id),
                ),
                "enum": available_engines,
            },
            "timeout": {
                "type": "number",
                "description": "Timeout in seconds (default: 60)",
            },
        },
        "required": ["query"],
    })
}

/// MCP tool definition for a consolidated tool.
pub fn build_tool(tool: &ToolCategory, available_engines: &[String]) -> Tool {
    let schema = match build_input_schema(tool, available_engines) {
        Value::Object(obj) => std::sync::Arc::new(obj),
        _ => std::sync::Arc::new(serde_json::Map::new()),
    };

    Tool {
        name: tool.id.to_string().into(),
        title: None,
        description: Some(tool.description.to_string().into()),
        input_schema: schema,
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_every_tool_has_parsers_in_static_catalog() {
        let parsers = catalog::static_parsers();
        for tool in TOOL_CATEGORIES {
            let engines = parsers_for_tool(tool.id, &parsers);
            assert!(!engines.is_empty(), "tool {} has no parsers", tool.id);
            assert!(
                engines.iter().any(|p| p.id == tool.default_engine),
                "default engine of {} missing from catalog",
                tool.id
            );
        }
    }

    #[test]
    fn test_unknown_tool_has_no_parsers() {
        let parsers = catalog::static_parsers();
        assert!(parsers_for_tool("no_such_tool", &parsers).is_empty());
    }

    #[test]
    fn test_empty_intersection_omits_engines() {
        // A collection with no FreeAI parsers leaves ask_ai empty.
        let parsers = vec![crate::catalog::ParserDescriptor {
            id: "google_search".to_string(),
            name: "Google Search".to_string(),
            category: "SE".to_string(),
            description: String::new(),
            remote_name: "SE::Google".to_string(),
        }];
        assert!(parsers_for_tool("ask_ai", &parsers).is_empty());
        assert_eq!(parsers_for_tool("search_web", &parsers).len(), 1);
    }

    #[test]
    fn test_default_engine_static_fallback() {
        assert_eq!(default_engine("search_web"), "google_search");
        assert_eq!(default_engine("no_such_tool"), "");
    }

    #[test]
    fn test_default_engine_env_override() {
        // translate's override variable is unused by the other tests, so
        // mutating it here cannot race with a parallel read.
        unsafe { std::env::set_var("DEFAULT_TRANSLATION_ENGINE", "deepl_translate") };
        assert_eq!(default_engine("translate"), "deepl_translate");
        unsafe { std::env::set_var("DEFAULT_TRANSLATION_ENGINE", "") };
        assert_eq!(default_engine("translate"), "google_translate");
        unsafe { std::env::remove_var("DEFAULT_TRANSLATION_ENGINE") };
    }

    #[test]
    fn test_find_tool_for_parser() {
        let parsers = catalog::static_parsers();
        let tool = find_tool_for_parser("pinterest_search", &parsers).expect("Visual maps to a tool");
        assert_eq!(tool.id, "get_social");
        assert!(find_tool_for_parser("unknown_parser", &parsers).is_none());
    }

    #[test]
    fn test_schema_shape() {
        let tool = find_tool("ask_ai").expect("ask_ai exists");
        let engines = vec!["perplexity".to_string(), "chatgpt".to_string()];
        let schema = build_input_schema(tool, &engines);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "query");
        assert_eq!(schema["properties"]["engine"]["enum"][1], "chatgpt");
    }
}
