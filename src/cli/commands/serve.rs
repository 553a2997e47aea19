//! Serve command: run one agent as an A2A server.

use crate::a2a::{server, AgentExecutor, RequestHandler};
use crate::agent::tools::{HostedWebSearch, WebTools};
use crate::agent::{FoundryClient, OpenAIChatModel, RagAgent, WebAgent};
use crate::cli::Output;
use crate::config::{Settings, DEFAULT_WEB_PROFILE};
use crate::executors::{card_url, AgentKind, CalculatorExecutor, RagExecutor, WebExecutor};
use crate::openai;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Run the A2A server for `kind`.
pub async fn run_serve(
    kind: AgentKind,
    host: Option<String>,
    port: Option<u16>,
    settings: &Settings,
) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.agents.host.clone());
    let port = port.unwrap_or_else(|| kind.port(&settings.agents));

    let executor = build_executor(kind, settings)
        .await
        .with_context(|| format!("Failed to start the {} agent", kind))?;

    let card = kind.card(&card_url(&settings.agents.base_url, port));
    Output::header(&card.name);
    Output::kv("Card", &card.url);
    Output::kv("Streaming", &card.capabilities.streaming.to_string());

    let handler = Arc::new(RequestHandler::new(
        card,
        executor,
        settings.agents.task_retention,
    ));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting {} agent server on {}", kind, addr);
    Output::success(&format!("Listening on http://{}", addr));
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(listener, handler).await?;
    Ok(())
}

async fn build_executor(kind: AgentKind, settings: &Settings) -> Result<Arc<dyn AgentExecutor>> {
    let executor: Arc<dyn AgentExecutor> = match kind {
        AgentKind::Calculator => Arc::new(CalculatorExecutor::new()),

        AgentKind::Rag => {
            let endpoint = settings.foundry_endpoint()?;
            let assistant_id = settings.assistant_id()?;
            let client = FoundryClient::connect(&settings.foundry, endpoint, assistant_id).await?;
            Arc::new(RagExecutor::new(RagAgent::new(Arc::new(client), assistant_id)))
        }

        AgentKind::Web => {
            let api_key = settings.openai_api_key()?;
            let profile = settings.profile_source().load(DEFAULT_WEB_PROFILE).await?;
            info!("Loaded agent profile '{}' ({})", profile.name, profile.model);

            let model = OpenAIChatModel::new(openai::create_client(&settings.openai)?, &profile.model);
            let search = HostedWebSearch::new(
                openai::http_client(&settings.openai)?,
                &settings.openai.base_url,
                api_key,
                &settings.openai.search_model,
            );
            let tools = WebTools::new(Arc::new(search), &profile.tools)?;
            Arc::new(WebExecutor::new(WebAgent::new(
                &profile,
                Arc::new(model),
                Arc::new(tools),
            )))
        }
    };
    Ok(executor)
}
