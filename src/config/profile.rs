//! Named agent profiles (instructions, model, tools) stored as JSON.

use crate::agent::tools::KNOWN_TOOLS;
use crate::error::{RelayError, Result};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Profile used when no `web.json` exists.
pub const DEFAULT_WEB_PROFILE: &str = "web";

/// Configuration of a tool-using agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_instructions() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_turns() -> usize {
    3
}

impl AgentProfile {
    /// Built-in web search profile.
    pub fn default_web() -> Self {
        Self {
            name: "Web Search Agent".to_string(),
            instructions: "You answer questions by searching the web. Use web_search for \
                anything that may have changed recently and get_current_date when the \
                answer depends on today's date. Cite the sources you used."
                .to_string(),
            model: default_model(),
            tools: vec!["web_search".to_string(), "get_current_date".to_string()],
            max_turns: default_max_turns(),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(unknown) = self.tools.iter().find(|t| !KNOWN_TOOLS.contains(&t.as_str())) {
            return Err(RelayError::Config(format!("Tool '{}' is not a known tool", unknown)));
        }
        if self.max_turns == 0 {
            return Err(RelayError::Config("max_turns must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Parse USE_REDIS: `true` or `false`, case-insensitive.
pub fn parse_use_redis(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(RelayError::Config(format!(
            "USE_REDIS environment variable must be 'True' or 'False', got: {}",
            other
        ))),
    }
}

/// Redis key holding the JSON profile called `name`.
pub fn redis_key(name: &str) -> String {
    format!("agent|{}", name)
}

/// Where agent profiles are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// `<dir>/<name>.json` files.
    Files(PathBuf),
    /// JSON strings under `agent|<name>` in a Redis database.
    Redis(String),
}

impl ProfileSource {
    /// Load and validate the profile called `name`.
    pub async fn load(&self, name: &str) -> Result<AgentProfile> {
        match self {
            ProfileSource::Files(dir) => load_profile(dir, name),
            ProfileSource::Redis(url) => read_redis_profile(url, name)
                .await
                .map_err(|e| in_context(name, e)),
        }
    }
}

/// Load and validate the profile called `name` from `<dir>/<name>.json`.
pub fn load_profile(dir: &Path, name: &str) -> Result<AgentProfile> {
    read_file_profile(dir, name).map_err(|e| in_context(name, e))
}

fn in_context(name: &str, e: RelayError) -> RelayError {
    match e {
        RelayError::Config(msg) => RelayError::Config(format!(
            "Failed to load configuration for agent '{}': {}",
            name, msg
        )),
        other => other,
    }
}

fn read_file_profile(dir: &Path, name: &str) -> Result<AgentProfile> {
    let path = dir.join(format!("{}.json", name));
    if !path.exists() {
        if name == DEFAULT_WEB_PROFILE {
            info!("No {} found, using the built-in web profile", path.display());
            return Ok(AgentProfile::default_web());
        }
        return Err(RelayError::Config(format!(
            "Configuration file {} not found",
            path.display()
        )));
    }

    debug!("Loading agent profile from {}", path.display());
    let content = std::fs::read_to_string(&path)?;
    parse_profile(name, &content, &path.display().to_string())
}

async fn read_redis_profile(url: &str, name: &str) -> Result<AgentProfile> {
    let key = redis_key(name);
    let unreachable =
        |e: redis::RedisError| RelayError::Config(format!("Could not connect to Redis at {}: {}", url, e));

    let client = redis::Client::open(url).map_err(unreachable)?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(unreachable)?;

    debug!("Loading agent profile from Redis key {}", key);
    let content: Option<String> = connection.get(&key).await.map_err(|e| {
        RelayError::Config(format!("Failed to read Redis key {}: {}", key, e))
    })?;
    let content = content.ok_or_else(|| {
        RelayError::Config(format!("Configuration not found in Redis (key: {})", key))
    })?;
    parse_profile(name, &content, &format!("Redis key {}", key))
}

/// Parse and validate profile JSON read from `origin`.
fn parse_profile(name: &str, content: &str, origin: &str) -> Result<AgentProfile> {
    let mut profile: AgentProfile = serde_json::from_str(content)
        .map_err(|e| RelayError::Config(format!("Invalid configuration in {}: {}", origin, e)))?;
    if profile.name.is_empty() {
        profile.name = name.to_string();
    }
    profile.validate()?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(format!("{}.json", name)), content).unwrap();
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "news", r#"{"tools": ["web_search"]}"#);

        let profile = load_profile(dir.path(), "news").unwrap();
        assert_eq!(profile.name, "news");
        assert_eq!(profile.instructions, "You are a helpful assistant.");
        assert_eq!(profile.model, "gpt-4o-mini");
        assert_eq!(profile.max_turns, 3);
    }

    #[test]
    fn test_unknown_tool_and_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a", r#"{"tools": ["file_search"]}"#);
        write(dir.path(), "b", r#"{"temperature": 0.2}"#);

        let err = load_profile(dir.path(), "a").unwrap_err().to_string();
        assert!(err.contains("Failed to load configuration for agent 'a'"));
        assert!(err.contains("file_search"));
        assert!(load_profile(dir.path(), "b").is_err());
    }

    #[test]
    fn test_missing_profiles() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_profile(dir.path(), "web").unwrap(),
            AgentProfile::default_web()
        );
        assert!(load_profile(dir.path(), "other").is_err());
    }

    #[test]
    fn test_redis_key_and_stored_profile() {
        assert_eq!(redis_key("web"), "agent|web");

        let profile = parse_profile(
            "web",
            r#"{"name": "News Agent", "tools": ["web_search"], "max_turns": 5}"#,
            "Redis key agent|web",
        )
        .unwrap();
        assert_eq!(profile.name, "News Agent");
        assert_eq!(profile.max_turns, 5);

        let err = parse_profile("web", "{not json", "Redis key agent|web")
            .unwrap_err()
            .to_string();
        assert!(err.contains("Invalid configuration in Redis key agent|web"));
        assert!(parse_profile("web", r#"{"max_turns": 0}"#, "Redis key agent|web").is_err());
    }

    #[tokio::test]
    async fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "news", r#"{"tools": ["get_current_date"]}"#);

        let files = ProfileSource::Files(dir.path().to_path_buf());
        assert_eq!(files.load("news").await.unwrap().tools, vec!["get_current_date"]);

        // Nothing listens on port 1.
        let redis = ProfileSource::Redis("redis://127.0.0.1:1/0".to_string());
        let err = redis.load("web").await.unwrap_err().to_string();
        assert!(err.contains("Failed to load configuration for agent 'web'"));
        assert!(err.contains("Could not connect to Redis"));
    }

    #[test]
    fn test_use_redis_values() {
        assert!(parse_use_redis("True").unwrap());
        assert!(!parse_use_redis("false").unwrap());
        assert!(parse_use_redis("yes").is_err());
    }
}
