//! A2A protocol types (camelCase JSON, `kind` discriminators).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Protocol version advertised on agent cards.
pub const PROTOCOL_VERSION: &str = "0.2.5";

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    Unknown,
}

impl TaskState {
    /// Terminal states accept no further updates.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Rejected
        )
    }

    /// Paused until the client sends another message on the same task.
    pub fn awaits_input(self) -> bool {
        matches!(self, TaskState::InputRequired | TaskState::AuthRequired)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Rejected => "rejected",
            TaskState::AuthRequired => "auth-required",
            TaskState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A content part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
    Data {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text, .. } => Some(text),
            Part::Data { .. } => None,
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// A user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
            message_id: Uuid::new_v4().to_string(),
            task_id: None,
            context_id: None,
            metadata: None,
        }
    }

    /// An agent message bound to a task and context.
    pub fn agent_text(text: impl Into<String>, context_id: &str, task_id: &str) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::text(text)],
            message_id: Uuid::new_v4().to_string(),
            task_id: Some(task_id.to_string()),
            context_id: Some(context_id.to_string()),
            metadata: None,
        }
    }

    /// All text parts joined by newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Current status of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Output produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn new(parts: Vec<Part>, name: Option<&str>) -> Self {
        Self {
            artifact_id: Uuid::new_v4().to_string(),
            name: name.map(str::to_string),
            parts,
        }
    }
}

/// A unit of work tracked through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
}

impl Task {
    /// A freshly submitted task whose history starts with the user's message.
    pub fn submitted(id: &str, context_id: &str, message: Message) -> Self {
        Self {
            id: id.to_string(),
            context_id: context_id.to_string(),
            status: TaskStatus::new(TaskState::Submitted, None),
            artifacts: Vec::new(),
            history: vec![message],
        }
    }

    /// Keep only the most recent `length` history entries.
    pub fn with_history_length(mut self, length: Option<usize>) -> Self {
        if let Some(length) = length {
            let excess = self.history.len().saturating_sub(length);
            self.history.drain(..excess);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
}

/// Anything an executor pushes to a task's event channel.
///
/// Also the shape of `message/send` results and streamed frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    #[serde(rename = "task")]
    Task(Task),
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdateEvent),
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl Event {
    /// Whether this event ends the task's event stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            Event::Task(task) => task.status.state.is_terminal(),
            Event::Message(_) => true,
            Event::StatusUpdate(update) => update.is_final || update.status.state.is_terminal(),
            Event::ArtifactUpdate(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Published capability descriptor of an agent server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl AgentCard {
    /// A text-in, text-out card with no skills.
    pub fn new(name: &str, description: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            url: url.to_string(),
            version: "1.0.0".to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: Vec::new(),
        }
    }

    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.capabilities.streaming = streaming;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    #[serde(default)]
    pub accepted_output_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl MessageSendParams {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            configuration: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let message = Message::agent_text("hello", "ctx-1", "task-1");
        let value = serde_json::to_value(Event::Message(message)).unwrap();

        assert_eq!(value["kind"], "message");
        assert_eq!(value["role"], "agent");
        assert_eq!(value["contextId"], "ctx-1");
        assert_eq!(value["taskId"], "task-1");
        assert_eq!(value["parts"][0], json!({"kind": "text", "text": "hello"}));
    }

    #[test]
    fn test_status_update_final_flag() {
        let event: Event = serde_json::from_value(json!({
            "kind": "status-update",
            "taskId": "t",
            "contextId": "c",
            "status": {"state": "completed"},
            "final": true
        }))
        .unwrap();

        assert!(event.is_terminal());
        match event {
            Event::StatusUpdate(update) => assert!(update.is_final),
            other => panic!("Expected status update, got {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Rejected.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert_eq!(TaskState::InputRequired.to_string(), "input-required");
    }

    #[test]
    fn test_user_input_joins_text_parts() {
        let mut message = Message::user_text("first");
        message.parts.push(Part::Data {
            data: json!({"ignored": true}),
            metadata: None,
        });
        message.parts.push(Part::text("second"));
        assert_eq!(message.text(), "first\nsecond");
    }

    #[test]
    fn test_history_length_keeps_latest() {
        let mut task = Task::submitted("t", "c", Message::user_text("one"));
        task.history.push(Message::agent_text("two", "c", "t"));
        task.history.push(Message::agent_text("three", "c", "t"));

        let trimmed = task.with_history_length(Some(2));
        let texts: Vec<_> = trimmed.history.iter().map(Message::text).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_card_defaults_on_deserialize() {
        let card: AgentCard = serde_json::from_value(json!({
            "name": "Web Search Agent",
            "description": "Searches the web",
            "url": "http://localhost:9999",
            "version": "1.0.0",
            "defaultInputModes": ["text"],
            "defaultOutputModes": ["text"]
        }))
        .unwrap();

        assert_eq!(card.protocol_version, PROTOCOL_VERSION);
        assert!(!card.capabilities.streaming);
        assert!(card.skills.is_empty());
    }
}
