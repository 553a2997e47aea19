//! Tools available to the web agent.

use super::runner::{ToolSet, ToolSpec};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const WEB_SEARCH: &str = "web_search";
pub const GET_CURRENT_DATE: &str = "get_current_date";

/// Tool names a profile may list.
pub const KNOWN_TOOLS: &[&str] = &[WEB_SEARCH, GET_CURRENT_DATE];

pub fn current_date_text() -> String {
    format!(
        "The current date is {}",
        chrono::Local::now().format("%Y-%m-%d")
    )
}

/// Something that can search the web and summarize the results.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// OpenAI's hosted web search via the Responses API.
pub struct HostedWebSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HostedWebSearch {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesOutput {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl ResponsesOutput {
    fn text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter())
            .filter(|c| c.kind == "output_text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl WebSearch for HostedWebSearch {
    async fn search(&self, query: &str) -> Result<String> {
        debug!("Hosted web search: {}", query);
        let response = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "tools": [{ "type": "web_search_preview" }],
                "input": query,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::OpenAI(format!(
                "Web search failed ({}): {}",
                status, body
            )));
        }

        let output: ResponsesOutput = response.json().await?;
        let text = output.text();
        if text.is_empty() {
            return Err(RelayError::OpenAI(
                "Web search returned no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// The tools enabled by a profile.
pub struct WebTools {
    search: Arc<dyn WebSearch>,
    enabled: Vec<String>,
}

impl WebTools {
    pub fn new(search: Arc<dyn WebSearch>, enabled: &[String]) -> Result<Self> {
        if let Some(unknown) = enabled.iter().find(|t| !KNOWN_TOOLS.contains(&t.as_str())) {
            return Err(RelayError::Config(format!("Unknown tool: {}", unknown)));
        }
        Ok(Self {
            search,
            enabled: enabled.to_vec(),
        })
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|t| t == name)
    }
}

#[async_trait]
impl ToolSet for WebTools {
    fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = Vec::new();
        if self.is_enabled(WEB_SEARCH) {
            specs.push(ToolSpec {
                name: WEB_SEARCH.to_string(),
                description: "Search the web for up-to-date information.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "What to search for"
                        }
                    },
                    "required": ["query"]
                }),
            });
        }
        if self.is_enabled(GET_CURRENT_DATE) {
            specs.push(ToolSpec {
                name: GET_CURRENT_DATE.to_string(),
                description: "Get the current date.".to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            });
        }
        specs
    }

    async fn call(&self, name: &str, arguments: &str) -> Result<String> {
        if !self.is_enabled(name) {
            return Err(RelayError::Agent(format!("Tool '{}' is not enabled", name)));
        }
        match name {
            WEB_SEARCH => {
                let args: SearchArgs = serde_json::from_str(arguments)
                    .map_err(|e| RelayError::InvalidInput(format!("web_search arguments: {}", e)))?;
                self.search.search(&args.query).await
            }
            GET_CURRENT_DATE => Ok(current_date_text()),
            other => Err(RelayError::Agent(format!("Unknown tool: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::EchoSearch;

    #[test]
    fn test_current_date_format() {
        let text = current_date_text();
        let date = text.strip_prefix("The current date is ").unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
    }

    #[tokio::test]
    async fn test_only_enabled_tools_are_offered() {
        let tools = WebTools::new(Arc::new(EchoSearch), &[GET_CURRENT_DATE.to_string()]).unwrap();
        let names: Vec<String> = tools.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![GET_CURRENT_DATE.to_string()]);
        assert!(tools.call(WEB_SEARCH, r#"{"query":"x"}"#).await.is_err());
        assert!(WebTools::new(Arc::new(EchoSearch), &["file_search".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_web_search_passes_query() {
        let tools = WebTools::new(Arc::new(EchoSearch), &[WEB_SEARCH.to_string()]).unwrap();
        let out = tools.call(WEB_SEARCH, r#"{"query":"rust 2024"}"#).await.unwrap();
        assert_eq!(out, "results for: rust 2024");
    }

    #[test]
    fn test_responses_output_text() {
        let output: ResponsesOutput = serde_json::from_value(json!({
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "It rained.", "annotations": []}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(output.text(), "It rained.");
    }
}
