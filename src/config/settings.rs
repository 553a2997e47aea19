//! Configuration settings for agent-relay.

use super::profile::{parse_use_redis, ProfileSource};
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub agents: AgentServerSettings,
    pub foundry: FoundrySettings,
    pub openai: OpenAISettings,
    pub mcp: McpSettings,
    pub conversation: ConversationSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when neither `-v` nor RUST_LOG is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// A2A agent server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentServerSettings {
    /// Interface the agent servers bind to.
    pub host: String,
    pub calculator_port: u16,
    pub rag_port: u16,
    pub web_port: u16,
    /// Scheme and host advertised on agent cards; the port is appended.
    pub base_url: String,
    /// Overrides the per-agent port when set (INTERNAL_PORT).
    pub internal_port: Option<u16>,
    /// Finished tasks kept queryable through `tasks/get`.
    pub task_retention: usize,
    /// Directory holding `<name>.json` agent profiles.
    pub profiles_dir: String,
    /// Read profiles from Redis instead of `profiles_dir`.
    pub use_redis: bool,
    pub redis_url: String,
}

impl Default for AgentServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            calculator_port: 9996,
            rag_port: 9998,
            web_port: 9999,
            base_url: "http://localhost".to_string(),
            internal_port: None,
            task_retention: crate::a2a::registry::DEFAULT_RETENTION,
            profiles_dir: "configs".to_string(),
            use_redis: false,
            redis_url: "redis://localhost:6379/0".to_string(),
        }
    }
}

/// Azure AI Foundry project settings for the RAG agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundrySettings {
    /// Project endpoint (FOUNDRY_PROJECT).
    pub endpoint: Option<String>,
    /// Agent to run questions against (ASSISTANT_ID).
    pub assistant_id: Option<String>,
    /// User-assigned managed identity (CLIENT_ID).
    pub client_id: Option<String>,
    /// Pre-issued bearer token (AZURE_ACCESS_TOKEN). Never written back to disk.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub api_version: String,
    /// Delay between run status polls.
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for FoundrySettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            assistant_id: None,
            client_id: None,
            access_token: None,
            api_version: "v1".to_string(),
            poll_interval_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

/// OpenAI settings for the web agent and the chat front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key (OPENAI_API_KEY).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used by the hosted web search tool.
    pub search_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            search_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// MCP orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    pub host: String,
    /// Listening port (MCP_PORT).
    pub port: u16,
    /// Path of the streamable HTTP endpoint.
    pub path: String,
    /// Base URL of the web search agent (WEB_A2A_BASE_URL).
    pub web_agent_url: String,
    /// Base URL of the RAG agent (RAG_A2A_BASE_URL).
    pub rag_agent_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            path: "/mcp".to_string(),
            web_agent_url: "http://localhost:9999".to_string(),
            rag_agent_url: "http://localhost:9998".to_string(),
            request_timeout_secs: 200,
            connect_timeout_secs: 10,
        }
    }
}

impl McpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Terminal conversation front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// MCP endpoint the chat connects to (MCP_SERVER_URL).
    pub mcp_url: String,
    pub model: String,
    /// AGENT_NAME
    pub agent_name: String,
    /// AGENT_INSTRUCTIONS
    pub instructions: String,
    /// Messages kept in history before the oldest turns are dropped.
    pub max_history: usize,
    pub max_turns: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            mcp_url: "http://localhost:8080/mcp".to_string(),
            model: "gpt-4o".to_string(),
            agent_name: "ContosoAssistant".to_string(),
            instructions: "You are a helpful assistant for Contoso. Use search_knowledge for \
                questions about Contoso projects and events, and web_search for current \
                information from the web. Answer concisely."
                .to_string(),
            max_history: 20,
            max_turns: 10,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file, then the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override file values.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::read_file(path)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse the configuration file without consulting the environment.
    pub fn read_file(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Settings::default())
        }
    }

    /// Apply environment overrides read through `env`.
    ///
    /// Values are only checked for presence; empty strings count as unset.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("FOUNDRY_PROJECT") {
            self.foundry.endpoint = Some(v);
        }
        if let Some(v) = get("ASSISTANT_ID") {
            self.foundry.assistant_id = Some(v);
        }
        if let Some(v) = get("CLIENT_ID") {
            self.foundry.client_id = Some(v);
        }
        if let Some(v) = get("AZURE_ACCESS_TOKEN") {
            self.foundry.access_token = Some(v);
        }
        if let Some(v) = get("USE_REDIS") {
            self.agents.use_redis = parse_use_redis(&v)?;
        }
        if let Some(v) = get("REDIS_URL") {
            self.agents.redis_url = v;
        }
        if let Some(v) = get("WEB_A2A_BASE_URL") {
            self.mcp.web_agent_url = v;
        }
        if let Some(v) = get("RAG_A2A_BASE_URL") {
            self.mcp.rag_agent_url = v;
        }
        if let Some(v) = get("MCP_PORT") {
            self.mcp.port = parse_port("MCP_PORT", &v)?;
        }
        if let Some(v) = get("INTERNAL_PORT") {
            self.agents.internal_port = Some(parse_port("INTERNAL_PORT", &v)?);
        }
        if let Some(v) = get("MCP_SERVER_URL") {
            self.conversation.mcp_url = v;
        }
        if let Some(v) = get("AGENT_NAME") {
            self.conversation.agent_name = v;
        }
        if let Some(v) = get("AGENT_INSTRUCTIONS") {
            self.conversation.instructions = v;
        }
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agent-relay")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded agent profile directory.
    pub fn profiles_dir(&self) -> PathBuf {
        Self::expand_path(&self.agents.profiles_dir)
    }

    /// Where agent profiles come from, per `use_redis`.
    pub fn profile_source(&self) -> ProfileSource {
        if self.agents.use_redis {
            ProfileSource::Redis(self.agents.redis_url.clone())
        } else {
            ProfileSource::Files(self.profiles_dir())
        }
    }

    pub fn openai_api_key(&self) -> Result<&str> {
        self.openai
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::Config("OPENAI_API_KEY is not set".to_string()))
    }

    pub fn foundry_endpoint(&self) -> Result<&str> {
        self.foundry
            .endpoint
            .as_deref()
            .ok_or_else(|| RelayError::Config("FOUNDRY_PROJECT is not set".to_string()))
    }

    pub fn assistant_id(&self) -> Result<&str> {
        self.foundry
            .assistant_id
            .as_deref()
            .ok_or_else(|| RelayError::Config("ASSISTANT_ID is not set".to_string()))
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{} must be a port number, got: {}", key, value)))
}
