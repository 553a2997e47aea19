//! Interactive chat command backed by the MCP tools.

use crate::agent::runner::{RunHooks, ToolCallRecord, ToolSet};
use crate::agent::OpenAIChatModel;
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::{ConversationSession, McpToolSet};
use crate::mcp::McpClient;
use crate::openai::create_client;
use anyhow::Result;
use console::style;
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::warn;

/// Prints each tool call as it finishes, pausing the spinner around it.
struct StepPrinter {
    spinner: ProgressBar,
}

impl RunHooks for StepPrinter {
    fn on_tool_end(&self, record: &ToolCallRecord) {
        self.spinner
            .suspend(|| Output::step(&record.name, record.succeeded));
    }
}

/// Run the interactive chat command.
pub async fn run_chat(mcp_url: Option<String>, model: Option<String>, settings: &Settings) -> Result<()> {
    let conversation = &settings.conversation;
    let mcp_url = mcp_url.unwrap_or_else(|| conversation.mcp_url.clone());
    let model = model.unwrap_or_else(|| conversation.model.clone());

    let chat_model = Arc::new(OpenAIChatModel::new(create_client(&settings.openai)?, &model));
    let tools = connect_tools(&mcp_url, settings).await;

    let mut session = ConversationSession::new(conversation, chat_model, tools);

    println!("\n{}", style(session.agent_name()).bold().cyan());
    if session.has_tools() {
        Output::info(&format!("Using MCP tools from {}", mcp_url));
    }
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("User:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.clear();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let hooks = StepPrinter {
            spinner: spinner.clone(),
        };
        let result = session.send(input, &hooks).await;
        spinner.finish_and_clear();

        match result {
            Ok(turn) => {
                println!(
                    "\n{} {}\n",
                    style(format!("# {}:", session.agent_name())).cyan().bold(),
                    turn.answer
                );
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

/// Connect to the MCP server; without it the chat has no tools.
async fn connect_tools(mcp_url: &str, settings: &Settings) -> Option<Arc<dyn ToolSet>> {
    let client = match McpClient::new(mcp_url, settings.mcp.request_timeout()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!("Failed to build MCP client: {}", e);
            Output::warning(&format!("MCP client unavailable ({}); basic chat only.", e));
            return None;
        }
    };

    match McpToolSet::connect(client).await {
        Ok(tools) => Some(Arc::new(tools) as Arc<dyn ToolSet>),
        Err(e) => {
            warn!("MCP server at {} unreachable: {}", mcp_url, e);
            Output::warning(&format!(
                "Could not reach the MCP server at {} ({}); basic chat only.",
                mcp_url, e
            ));
            None
        }
    }
}
