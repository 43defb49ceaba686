use anthropic_ai_sdk::client::AnthropicClient;
use anthropic_ai_sdk::types::message::{
    ContentBlock, CreateMessageParams, CreateMessageResponse, Message, MessageClient, MessageError,
    RequiredMessageParams, Role, Tool,
};
use async_trait::async_trait;

use crate::error::ProviderError;
use crate::llm::{
    ChatMessage, ChatModel, Completion, TokenUsage, ToolCall, ToolDeclaration, joined,
    system_prompt,
};

pub(crate) const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone)]
pub struct AnthropicModelConfig {
    pub api_key: String,
    /// Model id, e.g. `claude-sonnet-4-5`.
    pub model: String,
    pub max_tokens: u32,
    /// Proxy or gateway in front of the Messages API.
    pub api_base_url: Option<String>,
}

impl AnthropicModelConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            api_base_url: None,
        }
    }
}

/// Claude through the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicModel {
    client: AnthropicClient,
    config: AnthropicModelConfig,
}

impl AnthropicModel {
    pub fn new(config: AnthropicModelConfig) -> Result<Self, ProviderError> {
        let mut builder = AnthropicClient::builder(
            config.api_key.clone(),
            AnthropicClient::DEFAULT_API_VERSION.to_string(),
        );
        if let Some(base_url) = &config.api_base_url {
            builder = builder.with_api_base_url(base_url.clone());
        }
        let client = builder
            .build::<MessageError>()
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| ProviderError::MissingCredentials(API_KEY_VAR))?;
        Self::new(AnthropicModelConfig::new(api_key, model))
    }

    fn params(&self, history: &[ChatMessage], tools: &[ToolDeclaration]) -> CreateMessageParams {
        let mut params = CreateMessageParams::new(RequiredMessageParams {
            model: self.config.model.clone(),
            messages: to_messages(history),
            max_tokens: self.config.max_tokens,
        })
        .with_stream(false);

        if let Some(system) = system_prompt(history) {
            params = params.with_system(system);
        }
        if !tools.is_empty() {
            let tools = tools
                .iter()
                .map(|tool| Tool {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    input_schema: tool.parameters.clone(),
                })
                .collect();
            params = params.with_tools(tools);
        }
        params
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Completion, ProviderError> {
        let params = self.params(history, tools);
        tracing::debug!(model = %self.config.model, history = history.len(), "anthropic request");

        let response = self
            .client
            .create_message(Some(&params))
            .await
            .map_err(|err| {
                tracing::warn!(model = %self.config.model, error = %err, "anthropic request failed");
                ProviderError::Transport(err.to_string())
            })?;

        Ok(to_completion(&response))
    }
}

/// Replays history as Messages API turns. Results of parallel tool calls are
/// grouped into a single user turn, as the API expects.
fn to_messages(history: &[ChatMessage]) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut results = Vec::new();

    for entry in history {
        if let ChatMessage::Tool(reply) = entry {
            results.push(ContentBlock::ToolResult {
                tool_use_id: reply.call_id.clone(),
                content: reply.flagged_content(),
            });
            continue;
        }
        if !results.is_empty() {
            messages.push(Message::new_blocks(Role::User, std::mem::take(&mut results)));
        }

        match entry {
            ChatMessage::User(text) => messages.push(Message::new_text(Role::User, text.clone())),
            ChatMessage::Assistant(turn) => {
                let text = turn
                    .text
                    .iter()
                    .filter(|text| !text.is_empty())
                    .map(|text| ContentBlock::Text { text: text.clone() });
                let calls = turn.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                });
                let blocks = text.chain(calls).collect::<Vec<_>>();
                if !blocks.is_empty() {
                    messages.push(Message::new_blocks(Role::Assistant, blocks));
                }
            }
            ChatMessage::System(_) | ChatMessage::Tool(_) => {}
        }
    }

    if !results.is_empty() {
        messages.push(Message::new_blocks(Role::User, results));
    }
    messages
}

fn to_completion(response: &CreateMessageResponse) -> Completion {
    let mut text = Vec::new();
    let mut thinking = Vec::new();
    let mut tool_calls = Vec::new();

    for block in &response.content {
        match block {
            ContentBlock::Text { text: part } => text.push(part.clone()),
            ContentBlock::Thinking { thinking: part, .. } => thinking.push(part.clone()),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id.clone(), name.clone(), input.clone()));
            }
            _ => {}
        }
    }

    Completion {
        text: joined(text),
        thinking: joined(thinking),
        tool_calls,
        usage: Some(TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        }),
    }
}

#[cfg(test)]
mod tests {
    use anthropic_ai_sdk::types::message::{MessageContent, StopReason, Usage};
    use serde_json::json;

    use super::*;
    use crate::llm::{AssistantTurn, ToolReply};

    fn response(content: Vec<ContentBlock>) -> CreateMessageResponse {
        CreateMessageResponse {
            content,
            id: "msg_01".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            role: Role::Assistant,
            stop_reason: Some(StopReason::ToolUse),
            stop_sequence: None,
            type_: "message".to_string(),
            usage: Usage {
                input_tokens: 40,
                output_tokens: 9,
            },
        }
    }

    fn reply(call_id: &str, content: &str, is_error: bool) -> ChatMessage {
        ChatMessage::Tool(ToolReply {
            call_id: call_id.to_string(),
            tool: "get_weather".to_string(),
            content: content.to_string(),
            is_error,
        })
    }

    #[test]
    fn tool_use_blocks_become_tool_calls() {
        let completion = to_completion(&response(vec![
            ContentBlock::Thinking {
                thinking: "two cities, two lookups".to_string(),
                signature: "sig".to_string(),
            },
            ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "get_weather".to_string(),
                input: json!({"city": "Miami"}),
            },
            ContentBlock::ToolUse {
                id: "toolu_2".to_string(),
                name: "get_weather".to_string(),
                input: json!({"city": "Chicago"}),
            },
        ]));

        assert!(completion.text.is_none());
        assert_eq!(completion.thinking.as_deref(), Some("two cities, two lookups"));
        assert_eq!(
            completion.tool_calls,
            vec![
                ToolCall::new("toolu_1", "get_weather", json!({"city": "Miami"})),
                ToolCall::new("toolu_2", "get_weather", json!({"city": "Chicago"})),
            ]
        );
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                input_tokens: 40,
                output_tokens: 9,
            })
        );
    }

    #[test]
    fn parallel_tool_results_share_one_user_turn() {
        let history = vec![
            ChatMessage::System("You are a helpful assistant".to_string()),
            ChatMessage::User("Weather in Miami and Boston?".to_string()),
            ChatMessage::Assistant(AssistantTurn {
                text: None,
                tool_calls: vec![
                    ToolCall::new("toolu_1", "get_weather", json!({"city": "Miami"})),
                    ToolCall::new("toolu_2", "get_weather", json!({"city": "Boston"})),
                ],
            }),
            reply("toolu_1", "{\"condition\":\"Partly Cloudy\"}", false),
            reply("toolu_2", "lookup failed", true),
        ];

        let messages = to_messages(&history);
        assert_eq!(messages.len(), 3);

        let MessageContent::Blocks { content } = &messages[2].content else {
            panic!("expected tool results as blocks")
        };
        assert_eq!(content.len(), 2);
        assert_eq!(
            content[1],
            ContentBlock::ToolResult {
                tool_use_id: "toolu_2".to_string(),
                content: "Error: lookup failed".to_string(),
            }
        );
    }

    #[test]
    fn params_carry_system_prompt_and_tools() {
        let model = AnthropicModel::new(AnthropicModelConfig::new("key", "claude-sonnet-4-5"))
            .expect("client builds");
        let params = model.params(
            &[
                ChatMessage::System("You are a travel assistant".to_string()),
                ChatMessage::User("Status of DL789?".to_string()),
            ],
            &[ToolDeclaration {
                name: "get_flight_status".to_string(),
                description: "Get the current status of a flight".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
        );

        let value = serde_json::to_value(&params).expect("serializes");
        assert_eq!(value["system"], "You are a travel assistant");
        assert_eq!(value["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["tools"][0]["name"], "get_flight_status");
    }
}
