//! Azure AI Foundry Agents REST client.

use super::rag::{Run, RunStatus, ThreadBackend, ThreadMessage};
use crate::config::FoundrySettings;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Token audience for Foundry projects.
const FOUNDRY_RESOURCE: &str = "https://ai.azure.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
/// Refresh tokens this many seconds before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// How requests to the project are authorized.
#[derive(Debug, Clone)]
pub enum Credential {
    /// User-assigned managed identity.
    ManagedIdentity { client_id: String },
    /// A token obtained elsewhere, e.g. `az account get-access-token`.
    Static(String),
}

impl Credential {
    /// Managed identity when a client id is configured, otherwise the static token.
    pub fn from_settings(settings: &FoundrySettings) -> Result<Self> {
        if let Some(client_id) = &settings.client_id {
            info!("Using managed identity with client ID: {}", client_id);
            return Ok(Credential::ManagedIdentity {
                client_id: client_id.clone(),
            });
        }
        settings
            .access_token
            .clone()
            .map(Credential::Static)
            .ok_or_else(|| {
                RelayError::Config(
                    "Set CLIENT_ID for managed identity or AZURE_ACCESS_TOKEN".to_string(),
                )
            })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds since the epoch, as a string.
    expires_on: String,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    role: String,
    #[serde(default)]
    content: Vec<RawContent>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<RawText>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    value: String,
}

impl From<RawMessage> for ThreadMessage {
    fn from(raw: RawMessage) -> Self {
        Self {
            id: raw.id,
            role: raw.role,
            texts: raw
                .content
                .into_iter()
                .filter(|c| c.kind == "text")
                .filter_map(|c| c.text.map(|t| t.value))
                .collect(),
        }
    }
}

/// Thread/run backend on an Azure AI Foundry project.
pub struct FoundryClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    poll_interval: Duration,
    credential: Credential,
    token: Mutex<Option<CachedToken>>,
}

impl FoundryClient {
    pub fn new(settings: &FoundrySettings, endpoint: &str, credential: Credential) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            credential,
            token: Mutex::new(None),
        })
    }

    /// Build a client and check that the assistant exists.
    pub async fn connect(settings: &FoundrySettings, endpoint: &str, assistant_id: &str) -> Result<Self> {
        let client = Self::new(settings, endpoint, Credential::from_settings(settings)?)?;
        info!("Connecting to Azure AI Project: {}", client.endpoint);
        client.get_assistant(assistant_id).await?;
        info!("Found agent {}", assistant_id);
        Ok(client)
    }

    pub async fn get_assistant(&self, assistant_id: &str) -> Result<String> {
        let found: IdOnly = self
            .send(self.http.get(self.url(&format!("/assistants/{}", assistant_id))))
            .await?;
        Ok(found.id)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            self.http
                .get(self.url(&format!("/threads/{}/runs/{}", thread_id, run_id))),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            self.http
                .post(self.url(&format!("/threads/{}/runs/{}/cancel", thread_id, run_id))),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let token = self.bearer_token().await?;
        let response = request
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Backend(format!(
                "Foundry request failed ({}): {}",
                status, body
            )));
        }
        Ok(response.json().await?)
    }

    async fn bearer_token(&self) -> Result<String> {
        let client_id = match &self.credential {
            Credential::Static(token) => return Ok(token.clone()),
            Credential::ManagedIdentity { client_id } => client_id,
        };

        let mut cached = self.token.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting managed identity token");
        let response = self.request_identity_token(client_id).await?;
        let expires_at = response.expires_on.parse().unwrap_or(now);
        let value = response.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    async fn request_identity_token(&self, client_id: &str) -> Result<TokenResponse> {
        // Container Apps and App Service inject these; elsewhere fall back to IMDS.
        let endpoint = std::env::var("IDENTITY_ENDPOINT").ok();
        let header = std::env::var("IDENTITY_HEADER").ok();

        let request = match (endpoint, header) {
            (Some(endpoint), Some(header)) => self
                .http
                .get(endpoint)
                .header("X-IDENTITY-HEADER", header)
                .query(&[
                    ("api-version", "2019-08-01"),
                    ("resource", FOUNDRY_RESOURCE),
                    ("client_id", client_id),
                ]),
            _ => self.http.get(IMDS_ENDPOINT).header("Metadata", "true").query(&[
                ("api-version", "2018-02-01"),
                ("resource", FOUNDRY_RESOURCE),
                ("client_id", client_id),
            ]),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Backend(format!(
                "Managed identity token request failed ({})",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ThreadBackend for FoundryClient {
    async fn create_thread(&self) -> Result<String> {
        let thread: IdOnly = self
            .send(self.http.post(self.url("/threads")).json(&json!({})))
            .await?;
        Ok(thread.id)
    }

    async fn create_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()> {
        let _: IdOnly = self
            .send(
                self.http
                    .post(self.url(&format!("/threads/{}/messages", thread_id)))
                    .json(&json!({ "role": role, "content": content })),
            )
            .await?;
        Ok(())
    }

    async fn create_and_process_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let mut run: Run = self
            .send(
                self.http
                    .post(self.url(&format!("/threads/{}/runs", thread_id)))
                    .json(&json!({ "assistant_id": assistant_id })),
            )
            .await?;

        while !run.status.is_terminal() {
            if run.status == RunStatus::RequiresAction {
                // No tool outputs are ever submitted, so the run cannot progress.
                warn!("Run {} requires action; cancelling", run.id);
                if let Err(e) = self.cancel_run(thread_id, &run.id).await {
                    warn!("Failed to cancel run {}: {}", run.id, e);
                }
                return Err(RelayError::Backend(format!(
                    "Run {} requires action, but this agent has no tools to submit outputs for",
                    run.id
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            debug!("Run {} status: {:?}", run.id, run.status);
        }
        Ok(run)
    }

    async fn list_messages(&self, thread_id: &str, ascending: bool) -> Result<Vec<ThreadMessage>> {
        let order = if ascending { "asc" } else { "desc" };
        let list: MessageList = self
            .send(
                self.http
                    .get(self.url(&format!("/threads/{}/messages", thread_id)))
                    .query(&[("order", order)]),
            )
            .await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }
}
