//! Chat completions through async-openai.

use super::runner::{ChatMessage, ChatModel, ModelTurn, ToolInvocation, ToolSpec};
use crate::error::{RelayError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;

/// An OpenAI chat model.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

fn agent_err(e: impl std::fmt::Display) -> RelayError {
    RelayError::Agent(e.to_string())
}

fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message = match message {
        ChatMessage::System(content) => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(agent_err)?
            .into(),
        ChatMessage::User(content) => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map_err(agent_err)?
            .into(),
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                args.content(content.clone());
            }
            if !tool_calls.is_empty() {
                args.tool_calls(
                    tool_calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            args.build().map_err(agent_err)?.into()
        }
        ChatMessage::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(call_id.clone())
            .content(content.clone())
            .build()
            .map_err(agent_err)?
            .into(),
    };
    Ok(message)
}

fn to_tool(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<ModelTurn> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if !tools.is_empty() {
            args.tools(tools.iter().map(to_tool).collect::<Vec<_>>());
        }
        let request = args.build().map_err(agent_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| RelayError::OpenAI(format!("Chat completion error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::Agent("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ModelTurn {
            content: choice.message.content,
            tool_calls,
        })
    }
}
