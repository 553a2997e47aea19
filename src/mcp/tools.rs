//! MCP tool definitions for the orchestrator.

use super::protocol::Tool;
use serde_json::json;

pub const SEARCH_KNOWLEDGE: &str = "search_knowledge";
pub const WEB_SEARCH: &str = "web_search";

/// Get all available tools.
pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: SEARCH_KNOWLEDGE.to_string(),
            description: "Answer questions about Contoso projects and events using the \
                project knowledge base (RAG)."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question to answer"
                    }
                },
                "required": ["question"]
            }),
        },
        Tool {
            name: WEB_SEARCH.to_string(),
            description: "Perform a web search for the given query. Use this for current \
                events and anything not covered by the knowledge base."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to perform"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}
