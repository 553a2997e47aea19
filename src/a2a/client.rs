//! A2A client: card discovery, JSON-RPC calls and SSE consumption.

use super::sse::SseDecoder;
use super::types::{
    AgentCard, Event, Message, MessageSendParams, Task, TaskIdParams, TaskQueryParams,
};
use super::{
    AGENT_CARD_PATH, METHOD_CANCEL_TASK, METHOD_GET_TASK, METHOD_SEND_MESSAGE,
    METHOD_SEND_STREAMING_MESSAGE,
};
use crate::error::{RelayError, Result};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Build the HTTP client used for A2A calls.
pub fn build_http_client(timeout: Duration, connect_timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()?)
}

/// Fetches an agent card from a base URL.
pub struct CardResolver {
    http: reqwest::Client,
    base_url: Url,
}

impl CardResolver {
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    pub async fn get_agent_card(&self) -> Result<AgentCard> {
        let url = self.base_url.join(AGENT_CARD_PATH)?;
        debug!("Fetching agent card from {}", url);
        let card = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(card)
    }
}

/// JSON-RPC client for one agent, addressed by the URL on its card.
pub struct A2AClient {
    http: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl A2AClient {
    pub fn new(http: reqwest::Client, card: &AgentCard) -> Result<Self> {
        Ok(Self {
            http,
            url: Url::parse(&card.url)?,
            next_id: AtomicU64::new(1),
        })
    }

    fn request<P: Serialize>(&self, method: &str, params: &P) -> Result<JsonRpcRequest> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(JsonRpcRequest::new(
            Some(id.into()),
            method,
            Some(serde_json::to_value(params)?),
        ))
    }

    async fn call<P: Serialize, T: DeserializeOwned>(&self, method: &str, params: &P) -> Result<T> {
        let request = self.request(method, params)?;
        let response: JsonRpcResponse = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(serde_json::from_value(response.into_result()?)?)
    }

    /// `message/send`: the final task, or a direct message reply.
    #[instrument(skip(self, message))]
    pub async fn send_message(&self, message: Message) -> Result<Event> {
        self.call(METHOD_SEND_MESSAGE, &MessageSendParams::new(message))
            .await
    }

    /// `message/stream`: events as they arrive, ending after the terminal one.
    pub async fn send_message_streaming(
        &self,
        message: Message,
    ) -> Result<BoxStream<'static, Result<Event>>> {
        let request = self.request(METHOD_SEND_STREAMING_MESSAGE, &MessageSendParams::new(message))?;
        let response = self
            .http
            .post(self.url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let is_sse = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        if !is_sse {
            // Errors such as unsupported streaming come back as a plain JSON body.
            let response: JsonRpcResponse = response.json().await?;
            let event: Event = serde_json::from_value(response.into_result()?)?;
            return Ok(futures::stream::once(async { Ok(event) }).boxed());
        }

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            'frames: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(RelayError::Http(e));
                        break;
                    }
                };
                for payload in decoder.push(&chunk) {
                    let event = parse_frame(&payload);
                    let done = match &event {
                        Ok(event) => event.is_terminal(),
                        Err(_) => true,
                    };
                    yield event;
                    if done {
                        break 'frames;
                    }
                }
            }
        };
        Ok(stream.boxed())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let params = TaskQueryParams {
            id: task_id.to_string(),
            history_length: None,
        };
        match self.call(METHOD_GET_TASK, &params).await? {
            Event::Task(task) => Ok(task),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<Task> {
        let params = TaskIdParams {
            id: task_id.to_string(),
        };
        match self.call(METHOD_CANCEL_TASK, &params).await? {
            Event::Task(task) => Ok(task),
            other => Err(unexpected(&other)),
        }
    }
}

fn parse_frame(payload: &str) -> Result<Event> {
    let response: JsonRpcResponse = serde_json::from_str(payload)?;
    Ok(serde_json::from_value(response.into_result()?)?)
}

fn unexpected(event: &Event) -> RelayError {
    RelayError::Protocol(format!("Expected a task, got {:?}", event))
}

/// Text of the first part of the first artifact, or of a direct message reply.
pub fn extract_text(event: &Event) -> Result<String> {
    match event {
        Event::Task(task) => task
            .artifacts
            .first()
            .and_then(|artifact| artifact.parts.first())
            .and_then(|part| part.as_text())
            .map(str::to_string)
            .ok_or_else(|| {
                RelayError::Agent("No artifacts found in A2A agent response".to_string())
            }),
        Event::Message(message) => message
            .parts
            .iter()
            .find_map(|part| part.as_text())
            .map(str::to_string)
            .ok_or_else(|| RelayError::Agent("No text found in A2A agent reply".to_string())),
        other => Err(RelayError::Protocol(format!(
            "Unexpected A2A result: {:?}",
            other
        ))),
    }
}

/// A remote agent that answers a text question.
#[async_trait]
pub trait RemoteAgent: Send + Sync {
    async fn ask(&self, text: &str) -> Result<String>;
}

/// Forwards questions to an A2A agent, resolving its card on every call.
pub struct AgentProxy {
    http: reqwest::Client,
    base_url: String,
}

impl AgentProxy {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteAgent for AgentProxy {
    #[instrument(skip(self, text), fields(agent = %self.base_url))]
    async fn ask(&self, text: &str) -> Result<String> {
        let card = CardResolver::new(self.http.clone(), &self.base_url)?
            .get_agent_card()
            .await?;
        debug!("Resolved agent card '{}'", card.name);

        let client = A2AClient::new(self.http.clone(), &card)?;
        let result = client.send_message(Message::user_text(text)).await?;
        extract_text(&result)
    }
}
