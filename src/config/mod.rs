//! Configuration module for agent-relay.
//!
//! Handles loading settings (TOML file plus environment) and agent profiles.

mod profile;
mod settings;

pub use profile::{
    load_profile, parse_use_redis, redis_key, AgentProfile, ProfileSource, DEFAULT_WEB_PROFILE,
};
pub use settings::{
    AgentServerSettings, ConversationSettings, FoundrySettings, GeneralSettings, McpSettings,
    OpenAISettings, Settings,
};
