//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAISettings;
use crate::error::{RelayError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from settings, with the configured timeout.
pub fn create_client(settings: &OpenAISettings) -> Result<Client<OpenAIConfig>> {
    let api_key = settings
        .api_key
        .as_deref()
        .ok_or_else(|| RelayError::Config("OPENAI_API_KEY is not set".to_string()))?;

    let http_client = http_client(settings)?;
    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(settings.base_url.trim_end_matches('/'));

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Plain HTTP client for OpenAI endpoints async-openai does not cover.
pub fn http_client(settings: &OpenAISettings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()?)
}
