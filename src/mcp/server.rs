//! MCP server implementation: tools that forward to A2A agents.

use super::protocol::*;
use super::tools::{get_tools, SEARCH_KNOWLEDGE, WEB_SEARCH};
use crate::a2a::client::build_http_client;
use crate::a2a::{AgentProxy, RemoteAgent};
use crate::config::McpSettings;
use crate::error::Result;
use crate::jsonrpc::{
    self, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

const SERVER_NAME: &str = "Multi-Agent Tools Server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP server exposing the RAG and web agents as tools.
pub struct McpServer {
    rag: Arc<dyn RemoteAgent>,
    web: Arc<dyn RemoteAgent>,
}

impl McpServer {
    pub fn new(rag: Arc<dyn RemoteAgent>, web: Arc<dyn RemoteAgent>) -> Self {
        Self { rag, web }
    }

    /// Forward to the agents configured in settings over one shared HTTP client.
    pub fn from_settings(settings: &McpSettings) -> Result<Self> {
        let http = build_http_client(settings.request_timeout(), settings.connect_timeout())?;
        info!("RAG A2A agent configured at: {}", settings.rag_agent_url);
        info!("Web A2A agent configured at: {}", settings.web_agent_url);
        Ok(Self::new(
            Arc::new(AgentProxy::new(http.clone(), &settings.rag_agent_url)),
            Arc::new(AgentProxy::new(http, &settings.web_agent_url)),
        ))
    }

    /// Run over stdio: one JSON-RPC message per line in, one per line out.
    pub async fn run_stdio(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        info!("MCP server reading from stdin");
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Parse and handle one raw message.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match jsonrpc::parse_request(line.as_bytes()) {
            Ok(request) => self.handle_request(request).await,
            Err(response) => {
                warn!("Rejected request: {}", line);
                Some(response)
            }
        }
    }

    /// Handle a single JSON-RPC request. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(id),
            METHOD_PING => JsonRpcResponse::success(id, json!({})),
            METHOD_TOOLS_LIST => to_response(id, &ToolsListResult { tools: get_tools() }),
            METHOD_TOOLS_CALL => self.handle_tools_call(id, request.params).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", other),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };
        to_response(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        &format!("Invalid params: {}", e),
                    )
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let result = match params.name.as_str() {
            SEARCH_KNOWLEDGE => self.tool_search_knowledge(params.arguments).await,
            WEB_SEARCH => self.tool_web_search(params.arguments).await,
            _ => ToolCallResult::error(format!("Unknown tool: {}", params.name)),
        };

        to_response(id, &result)
    }

    /// RAG tool.
    async fn tool_search_knowledge(&self, args: Option<Value>) -> ToolCallResult {
        let question = match string_arg(&args, "question") {
            Ok(q) => q,
            Err(result) => return result,
        };

        info!("RAG tool called with question: {}", question);
        match self.rag.ask(question).await {
            Ok(answer) => ToolCallResult::text(answer),
            Err(e) => {
                error!("Error performing RAG query: {}", e);
                ToolCallResult::error(format!("Error performing RAG query: {}", e))
            }
        }
    }

    /// Web search tool.
    async fn tool_web_search(&self, args: Option<Value>) -> ToolCallResult {
        let query = match string_arg(&args, "query") {
            Ok(q) => q,
            Err(result) => return result,
        };

        info!("Web tool called with query: {}", query);
        match self.web.ask(query).await {
            Ok(answer) => ToolCallResult::text(answer),
            Err(e) => {
                error!("Error performing web search: {}", e);
                ToolCallResult::error(format!("Error performing web search: {}", e))
            }
        }
    }
}

fn string_arg<'a>(args: &'a Option<Value>, name: &str) -> std::result::Result<&'a str, ToolCallResult> {
    let args = args
        .as_ref()
        .ok_or_else(|| ToolCallResult::error("Missing arguments".to_string()))?;
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolCallResult::error(format!("Missing '{}' argument", name)))
}

fn to_response<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::jsonrpc::{INVALID_REQUEST, PARSE_ERROR};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed answer and remembers every question.
    struct RecordingAgent {
        answer: String,
        asked: Mutex<Vec<String>>,
    }

    impl RecordingAgent {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                asked: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RemoteAgent for RecordingAgent {
        async fn ask(&self, text: &str) -> Result<String> {
            self.asked.lock().unwrap().push(text.to_string());
            Ok(self.answer.clone())
        }
    }

    struct DownAgent;

    #[async_trait]
    impl RemoteAgent for DownAgent {
        async fn ask(&self, _text: &str) -> Result<String> {
            Err(RelayError::Agent("connection refused".to_string()))
        }
    }

    fn call(name: &str, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            Some(json!(1)),
            METHOD_TOOLS_CALL,
            Some(json!({ "name": name, "arguments": arguments })),
        )
    }

    fn tool_result(response: Option<JsonRpcResponse>) -> ToolCallResult {
        serde_json::from_value(response.unwrap().result.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_search_knowledge_forwards_unmodified() {
        let question = "  What is Astro Events?\n(exact text) ";
        let answer = "Astro Events is **Contoso's** stargazing series.\n";
        let rag = RecordingAgent::new(answer);
        let server = McpServer::new(rag.clone(), Arc::new(DownAgent));

        let result = tool_result(
            server
                .handle_request(call(SEARCH_KNOWLEDGE, json!({ "question": question })))
                .await,
        );

        assert!(!result.is_error());
        assert_eq!(result.joined_text(), answer);
        assert_eq!(*rag.asked.lock().unwrap(), vec![question.to_string()]);
    }

    #[tokio::test]
    async fn test_agent_failure_is_tool_error() {
        let server = McpServer::new(Arc::new(DownAgent), Arc::new(DownAgent));

        let rag = tool_result(
            server
                .handle_request(call(SEARCH_KNOWLEDGE, json!({ "question": "q" })))
                .await,
        );
        assert!(rag.is_error());
        assert!(rag.joined_text().starts_with("Error performing RAG query: "));

        let web = tool_result(
            server
                .handle_request(call(WEB_SEARCH, json!({ "query": "q" })))
                .await,
        );
        assert!(web.is_error());
        assert!(web.joined_text().starts_with("Error performing web search: "));
    }

    #[tokio::test]
    async fn test_protocol_methods() {
        let server = McpServer::new(RecordingAgent::new("a"), RecordingAgent::new("b"));

        let init = server
            .handle_request(JsonRpcRequest::new(
                Some(json!(0)),
                METHOD_INITIALIZE,
                Some(json!({"protocolVersion": MCP_PROTOCOL_VERSION, "capabilities": {}, "clientInfo": {"name": "t", "version": "1"}})),
            ))
            .await
            .unwrap();
        assert_eq!(init.result.unwrap()["serverInfo"]["name"], SERVER_NAME);

        let notification = JsonRpcRequest::new(None, NOTIFICATION_INITIALIZED, None);
        assert!(server.handle_request(notification).await.is_none());

        let tools = server
            .handle_request(JsonRpcRequest::new(Some(json!(2)), METHOD_TOOLS_LIST, None))
            .await
            .unwrap();
        let list: ToolsListResult = serde_json::from_value(tools.result.unwrap()).unwrap();
        let names: Vec<_> = list.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_KNOWLEDGE, WEB_SEARCH]);

        let unknown = server
            .handle_request(JsonRpcRequest::new(Some(json!(3)), "resources/list", None))
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, METHOD_NOT_FOUND);

        let garbage = server.handle_line("{not json").await.unwrap();
        assert_eq!(garbage.error.unwrap().code, PARSE_ERROR);

        let no_method = server.handle_line(r#"{"jsonrpc":"2.0","id":7}"#).await.unwrap();
        assert_eq!(no_method.id, Some(json!(7)));
        assert_eq!(no_method.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let server = McpServer::new(RecordingAgent::new("a"), RecordingAgent::new("b"));
        let result = tool_result(server.handle_request(call(WEB_SEARCH, json!({}))).await);
        assert!(result.is_error());
        assert_eq!(result.joined_text(), "Missing 'query' argument");
    }
}
