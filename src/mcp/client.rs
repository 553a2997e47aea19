//! MCP client over streamable HTTP.

use super::protocol::*;
use crate::a2a::sse::SseDecoder;
use crate::error::{RelayError, Result};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const SESSION_HEADER: &str = "mcp-session-id";

pub struct McpClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl McpClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handshake: `initialize` followed by the `initialized` notification.
    pub async fn initialize(&self, client_name: &str) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: client_name.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let result = self
            .request(METHOD_INITIALIZE, Some(serde_json::to_value(params)?))
            .await?;
        self.notify(NOTIFICATION_INITIALIZED).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn ping(&self) -> Result<()> {
        self.request(METHOD_PING, None).await.map(|_| ())
    }

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result: ToolsListResult =
            serde_json::from_value(self.request(METHOD_TOOLS_LIST, None).await?)?;
        Ok(result.tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let params = ToolCallParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let result = self
            .request(METHOD_TOOLS_CALL, Some(serde_json::to_value(params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let request = JsonRpcRequest::new(None, method, None);
        self.post(&request).await?.error_for_status()?;
        Ok(())
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(Some(id.into()), method, params);
        debug!("MCP request {}: {}", id, method);

        let response = self.post(&request).await?.error_for_status()?;
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut current) = self.session_id.lock() {
                *current = Some(session.to_string());
            }
        }

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        let response: JsonRpcResponse = if is_sse {
            let body = response.bytes().await?;
            response_in_stream(&body, &Value::from(id))?
        } else {
            response.json().await?
        };
        response.into_result()
    }

    async fn post(&self, request: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(request);
        let session = self.session_id.lock().ok().and_then(|s| s.clone());
        if let Some(session) = session {
            builder = builder.header(SESSION_HEADER, session);
        }
        Ok(builder.send().await?)
    }
}

/// The reply to request `id` within an SSE body.
///
/// Servers may interleave notifications and their own requests, so only a
/// payload carrying the matching id counts.
fn response_in_stream(body: &[u8], id: &Value) -> Result<JsonRpcResponse> {
    let mut decoder = SseDecoder::new();
    let payloads = decoder.push(body).into_iter().chain(decoder.push(b"\n\n"));
    for payload in payloads {
        let message: Value = serde_json::from_str(&payload)?;
        if message.get("id") == Some(id) && message.get("method").is_none() {
            return Ok(serde_json::from_value(message)?);
        }
        debug!("Skipping unrelated MCP message: {}", payload);
    }
    Err(RelayError::Protocol(format!(
        "MCP event stream carried no response to request {}",
        id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::RemoteAgent;
    use crate::mcp::{http, McpServer};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Upper;

    #[async_trait]
    impl RemoteAgent for Upper {
        async fn ask(&self, text: &str) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    #[test]
    fn test_stream_response_matched_by_id() {
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\",\"params\":{}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"stale\":true}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{\"tools\":[]}}\n\n",
        );
        let response = response_in_stream(body.as_bytes(), &json!(3)).unwrap();
        assert_eq!(response.result, Some(json!({"tools": []})));

        assert!(response_in_stream(body.as_bytes(), &json!(4)).is_err());
    }

    #[tokio::test]
    async fn test_client_against_http_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());
        let server = Arc::new(McpServer::new(Arc::new(Upper), Arc::new(Upper)));
        tokio::spawn(http::serve(listener, server, "/mcp"));

        let client = McpClient::new(&url, Duration::from_secs(5)).unwrap();
        let init = client.initialize("test").await.unwrap();
        assert_eq!(init.protocol_version, MCP_PROTOCOL_VERSION);
        client.ping().await.unwrap();

        assert_eq!(client.list_tools().await.unwrap().len(), 2);
        let result = client
            .call_tool("web_search", json!({"query": "rust"}))
            .await
            .unwrap();
        assert_eq!(result.joined_text(), "RUST");
    }
}
