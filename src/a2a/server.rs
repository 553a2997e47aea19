//! A2A HTTP server: agent card discovery plus JSON-RPC and SSE endpoints.

use super::events::{self, EventReceiver, TaskUpdater};
use super::executor::{AgentExecutor, RequestContext};
use super::registry::TaskRegistry;
use super::types::{AgentCard, Event, MessageSendParams, Task, TaskIdParams, TaskQueryParams};
use super::{
    AGENT_CARD_ALIAS_PATH, AGENT_CARD_PATH, METHOD_CANCEL_TASK, METHOD_GET_TASK,
    METHOD_SEND_MESSAGE, METHOD_SEND_STREAMING_MESSAGE,
};
use crate::error::{RelayError, Result};
use crate::jsonrpc::{
    self, JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
};
use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Routes JSON-RPC calls to an executor and keeps the task registry.
pub struct RequestHandler {
    card: AgentCard,
    executor: Arc<dyn AgentExecutor>,
    registry: TaskRegistry,
}

/// Outcome of dispatching one JSON-RPC request.
pub enum Dispatch {
    Single(JsonRpcResponse),
    Stream(Option<Value>, BoxStream<'static, Event>),
}

impl RequestHandler {
    pub fn new(card: AgentCard, executor: Arc<dyn AgentExecutor>, retention: usize) -> Self {
        Self {
            card,
            executor,
            registry: TaskRegistry::new(retention),
        }
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Dispatch a parsed JSON-RPC request.
    pub async fn dispatch(self: &Arc<Self>, request: JsonRpcRequest) -> Dispatch {
        let id = request.id.clone();

        if request.jsonrpc != JSONRPC_VERSION {
            return Dispatch::Single(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        debug!("A2A request: {}", request.method);

        let result = match request.method.as_str() {
            METHOD_SEND_MESSAGE => match jsonrpc::parse_params(request.params) {
                Ok(params) => self.on_message_send(params).await.and_then(to_value),
                Err(e) => Err(e),
            },
            METHOD_SEND_STREAMING_MESSAGE => {
                let stream = match jsonrpc::parse_params(request.params) {
                    Ok(params) => self.on_message_stream(params).await,
                    Err(e) => Err(e),
                };
                return match stream {
                    Ok(events) => Dispatch::Stream(id, events),
                    Err(e) => Dispatch::Single(JsonRpcResponse::from_error(id, &e)),
                };
            }
            METHOD_GET_TASK => match jsonrpc::parse_params(request.params) {
                Ok(params) => self
                    .on_get_task(params)
                    .await
                    .and_then(|task| to_value(Event::Task(task))),
                Err(e) => Err(e),
            },
            METHOD_CANCEL_TASK => match jsonrpc::parse_params(request.params) {
                Ok(params) => self
                    .on_cancel_task(params)
                    .await
                    .and_then(|task| to_value(Event::Task(task))),
                Err(e) => Err(e),
            },
            other => {
                return Dispatch::Single(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    &format!("Method not found: {}", other),
                ))
            }
        };

        Dispatch::Single(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                warn!("A2A request failed: {}", e);
                JsonRpcResponse::from_error(id, &e)
            }
        })
    }

    /// Run the executor to completion and return the final task or direct reply.
    #[instrument(skip(self, params))]
    pub async fn on_message_send(self: &Arc<Self>, params: MessageSendParams) -> Result<Event> {
        let history_length = params
            .configuration
            .as_ref()
            .and_then(|c| c.history_length);
        let context = self.prepare(params).await?;
        let task_id = context.task_id.clone();
        let mut events = self.spawn_execution(context);

        let mut latest = None;
        let mut reply = None;
        while let Some(applied) = events.recv().await {
            if let Event::Message(message) = applied.event {
                reply = Some(message);
            }
            if applied.task.is_some() {
                latest = applied.task;
            }
        }

        if let Some(message) = reply {
            return Ok(Event::Message(message));
        }
        let task = match latest {
            Some(task) => task,
            None => self
                .registry
                .get(&task_id)
                .await
                .ok_or_else(|| RelayError::Agent("Agent produced no events".to_string()))?,
        };
        Ok(Event::Task(task.with_history_length(history_length)))
    }

    /// Run the executor and hand back its events as they are produced.
    pub async fn on_message_stream(
        self: &Arc<Self>,
        params: MessageSendParams,
    ) -> Result<BoxStream<'static, Event>> {
        if !self.card.capabilities.streaming {
            return Err(RelayError::Unsupported(
                "Streaming is not supported by this agent".to_string(),
            ));
        }

        let context = self.prepare(params).await?;
        let mut events = self.spawn_execution(context);

        let stream = async_stream::stream! {
            while let Some(applied) = events.recv().await {
                yield applied.event;
            }
        };
        Ok(stream.boxed())
    }

    pub async fn on_get_task(&self, params: TaskQueryParams) -> Result<Task> {
        self.registry
            .get(&params.id)
            .await
            .map(|task| task.with_history_length(params.history_length))
            .ok_or(RelayError::TaskNotFound(params.id))
    }

    #[instrument(skip(self, params), fields(task_id = %params.id))]
    pub async fn on_cancel_task(&self, params: TaskIdParams) -> Result<Task> {
        let task = self
            .registry
            .get(&params.id)
            .await
            .ok_or_else(|| RelayError::TaskNotFound(params.id.clone()))?;

        if task.status.state.is_terminal() {
            return Err(RelayError::TaskNotCancelable(format!(
                "Task {} is already {}",
                task.id, task.status.state
            )));
        }

        let (queue, mut events) = events::channel();
        let updater = TaskUpdater::new(queue, &task.id, &task.context_id);
        let context = RequestContext {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message: None,
            current_task: Some(task.clone()),
        };

        info!("Cancel requested");
        self.executor.cancel(context, &updater).await?;
        drop(updater);

        while let Some(event) = events.next().await {
            self.registry.apply(&event).await;
        }
        Ok(self.registry.get(&task.id).await.unwrap_or(task))
    }

    async fn prepare(&self, params: MessageSendParams) -> Result<RequestContext> {
        let message = params.message;

        let current_task = match &message.task_id {
            Some(task_id) => {
                let task = self
                    .registry
                    .get(task_id)
                    .await
                    .ok_or_else(|| RelayError::TaskNotFound(task_id.clone()))?;
                if task.status.state.is_terminal() {
                    return Err(RelayError::InvalidInput(format!(
                        "Task {} is in terminal state {}",
                        task.id, task.status.state
                    )));
                }
                // Only a paused task may be resumed; a running one already has an executor.
                if !task.status.state.awaits_input() {
                    return Err(RelayError::InvalidInput(format!(
                        "Task {} is still {} and cannot take another message",
                        task.id, task.status.state
                    )));
                }
                Some(task)
            }
            None => None,
        };

        let task_id = current_task
            .as_ref()
            .map(|t| t.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let context_id = message
            .context_id
            .clone()
            .or_else(|| current_task.as_ref().map(|t| t.context_id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(RequestContext {
            task_id,
            context_id,
            message: Some(message),
            current_task,
        })
    }

    /// Spawn the executor and a relay recording its events in the registry.
    ///
    /// The registry sees every event whether or not anyone still reads the
    /// returned channel. A terminal `failed` event is published on the
    /// executor's behalf when it returns without one.
    fn spawn_execution(self: &Arc<Self>, context: RequestContext) -> mpsc::UnboundedReceiver<Applied> {
        let (queue, produced) = events::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let updater = TaskUpdater::new(queue, &context.task_id, &context.context_id);
        let executor = Arc::clone(&self.executor);

        tokio::spawn(Arc::clone(self).relay(produced, tx));

        tokio::spawn(async move {
            let outcome = executor.execute(context, &updater).await;
            if updater.is_closed() {
                if let Err(e) = outcome {
                    warn!("Executor error after task {} finished: {}", updater.task_id(), e);
                }
                return;
            }
            let reason = match outcome {
                Ok(()) => "Agent finished without producing a result".to_string(),
                Err(e) => {
                    error!("Executor failed for task {}: {}", updater.task_id(), e);
                    e.to_string()
                }
            };
            let _ = updater.failed(&reason);
        });

        rx
    }

    async fn relay(self: Arc<Self>, mut produced: EventReceiver, tx: mpsc::UnboundedSender<Applied>) {
        while let Some(event) = produced.next().await {
            let task = self.registry.apply(&event).await;
            if tx.send(Applied { event, task }).is_err() {
                debug!("Event consumer went away; still recording task events");
            }
        }
    }
}

/// An event together with the task snapshot it produced.
struct Applied {
    event: Event,
    task: Option<Task>,
}

fn to_value(event: Event) -> Result<Value> {
    Ok(serde_json::to_value(event)?)
}

/// Build the axum router for an agent server.
pub fn router(handler: Arc<RequestHandler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(rpc))
        .route(AGENT_CARD_PATH, get(agent_card))
        .route(AGENT_CARD_ALIAS_PATH, get(agent_card))
        .route("/health", get(health))
        .layer(cors)
        .with_state(handler)
}

/// Serve an agent on an already-bound listener until the process stops.
pub async fn serve(listener: tokio::net::TcpListener, handler: Arc<RequestHandler>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("A2A server '{}' listening on {}", handler.card().name, addr);
    }
    axum::serve(listener, router(handler)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn agent_card(State(handler): State<Arc<RequestHandler>>) -> impl IntoResponse {
    Json(handler.card().clone())
}

async fn rpc(State(handler): State<Arc<RequestHandler>>, body: Bytes) -> Response {
    let request = match jsonrpc::parse_request(&body) {
        Ok(request) => request,
        Err(response) => {
            warn!("Rejected A2A request body");
            return Json(response).into_response();
        }
    };

    match handler.dispatch(request).await {
        Dispatch::Single(response) => Json(response).into_response(),
        Dispatch::Stream(id, events) => {
            let frames =
                events.map(move |event| Ok::<_, Infallible>(sse_frame(id.clone(), &event)));
            Sse::new(frames)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
    }
}

fn sse_frame(id: Option<Value>, event: &Event) -> SseEvent {
    let response = match serde_json::to_value(event) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::from_error(id, &RelayError::Json(e)),
    };
    match serde_json::to_string(&response) {
        Ok(data) => SseEvent::default().data(data),
        Err(e) => SseEvent::default().comment(format!("unserializable event: {}", e)),
    }
}
