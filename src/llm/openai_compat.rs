use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ProviderError;
use crate::llm::{
    ChatMessage, ChatModel, Completion, TokenUsage, ToolCall, ToolDeclaration, api_failure,
    http_client,
};

const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";
const XAI_API_BASE_URL: &str = "https://api.x.ai/v1";

/// Which request field carries the output-token cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimitParam {
    /// `max_tokens`, still the only spelling xAI documents.
    MaxTokens,
    /// `max_completion_tokens`. OpenAI's reasoning models reject `max_tokens`.
    MaxCompletionTokens,
}

/// Configuration for any backend speaking the chat-completions wire format.
#[derive(Debug, Clone)]
pub struct OpenAiCompatModelConfig {
    /// Label used in logs and errors.
    pub provider: &'static str,
    pub api_key: String,
    pub model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub token_limit_param: TokenLimitParam,
}

impl OpenAiCompatModelConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "openai",
            api_key: api_key.into(),
            model: model.into(),
            api_base_url: OPENAI_API_BASE_URL.to_string(),
            max_tokens: 4096,
            token_limit_param: TokenLimitParam::MaxCompletionTokens,
        }
    }

    pub fn xai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "xai",
            api_base_url: XAI_API_BASE_URL.to_string(),
            token_limit_param: TokenLimitParam::MaxTokens,
            ..Self::openai(api_key, model)
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    client: Client,
    config: OpenAiCompatModelConfig,
}

impl OpenAiCompatModel {
    pub fn new(config: OpenAiCompatModelConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    pub fn openai_from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::MissingCredentials("OPENAI_API_KEY"))?;
        Self::new(OpenAiCompatModelConfig::openai(api_key, model))
    }

    /// Reads `XAI_API_KEY`, falling back to `GROK_API_KEY`.
    pub fn xai_from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = std::env::var("XAI_API_KEY")
            .or_else(|_| std::env::var("GROK_API_KEY"))
            .map_err(|_| ProviderError::MissingCredentials("XAI_API_KEY (or GROK_API_KEY)"))?;
        Self::new(OpenAiCompatModelConfig::xai(api_key, model))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Completion, ProviderError> {
        let provider = self.config.provider;
        let request = build_request(history, tools, &self.config);
        tracing::debug!(provider, model = %self.config.model, history = history.len(), "chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(api_failure(provider, response).await);
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        to_completion(provider, body)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum WireMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCall {
    id: String,
    #[serde(default = "function_kind")]
    r#type: String,
    function: WireCallFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCallFunction {
    name: String,
    /// JSON-encoded object, as a string.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireCall>,
    /// Reasoning trace some xAI models return alongside the answer.
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn build_request(
    history: &[ChatMessage],
    tools: &[ToolDeclaration],
    config: &OpenAiCompatModelConfig,
) -> ChatRequest {
    let (max_tokens, max_completion_tokens) = match config.token_limit_param {
        TokenLimitParam::MaxTokens => (Some(config.max_tokens), None),
        TokenLimitParam::MaxCompletionTokens => (None, Some(config.max_tokens)),
    };

    ChatRequest {
        model: config.model.clone(),
        messages: history.iter().filter_map(to_wire_message).collect(),
        tools: tools
            .iter()
            .map(|tool| WireTool {
                r#type: "function",
                function: WireFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
        max_tokens,
        max_completion_tokens,
    }
}

fn to_wire_message(message: &ChatMessage) -> Option<WireMessage> {
    let wire = match message {
        ChatMessage::System(content) => WireMessage::System {
            content: content.clone(),
        },
        ChatMessage::User(content) => WireMessage::User {
            content: content.clone(),
        },
        ChatMessage::Assistant(turn) => {
            let content = turn.text.clone().filter(|text| !text.is_empty());
            if content.is_none() && turn.tool_calls.is_empty() {
                return None;
            }
            WireMessage::Assistant {
                content,
                tool_calls: turn
                    .tool_calls
                    .iter()
                    .map(|call| WireCall {
                        id: call.id.clone(),
                        r#type: function_kind(),
                        function: WireCallFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            }
        }
        ChatMessage::Tool(reply) => WireMessage::Tool {
            tool_call_id: reply.call_id.clone(),
            content: reply.flagged_content(),
        },
    };
    Some(wire)
}

fn to_completion(provider: &str, response: ChatResponse) -> Result<Completion, ProviderError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        ProviderError::Malformed(format!("{provider} returned no choices"))
    })?;
    let message = choice.message;

    let mut tool_calls = Vec::with_capacity(message.tool_calls.len());
    for call in message.tool_calls {
        let raw = call.function.arguments.trim();
        let arguments = if raw.is_empty() {
            json!({})
        } else {
            serde_json::from_str(raw).map_err(|err| {
                ProviderError::Malformed(format!(
                    "{provider} sent unparseable arguments for {}: {err}",
                    call.function.name
                ))
            })?
        };
        tool_calls.push(ToolCall::new(call.id, call.function.name, arguments));
    }

    Ok(Completion {
        text: message.content.filter(|text| !text.is_empty()),
        thinking: message.reasoning_content.filter(|text| !text.is_empty()),
        tool_calls,
        usage: response.usage.map(|usage| TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{AssistantTurn, ToolReply};

    fn weather_tool() -> ToolDeclaration {
        ToolDeclaration {
            name: "get_weather".to_string(),
            description: "Get the current weather for a city".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            }),
        }
    }

    fn request_json(history: &[ChatMessage], config: &OpenAiCompatModelConfig) -> Value {
        serde_json::to_value(build_request(history, &[weather_tool()], config)).expect("serializes")
    }

    #[test]
    fn openai_caps_output_with_max_completion_tokens() {
        let value = request_json(
            &[ChatMessage::User("hi".to_string())],
            &OpenAiCompatModelConfig::openai("key", "o3-mini"),
        );
        assert_eq!(value["max_completion_tokens"], 4096);
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn xai_caps_output_with_max_tokens() {
        let value = request_json(
            &[ChatMessage::User("hi".to_string())],
            &OpenAiCompatModelConfig::xai("key", "grok-4"),
        );
        assert_eq!(value["max_tokens"], 4096);
        assert!(value.get("max_completion_tokens").is_none());
    }

    #[test]
    fn presets_point_at_their_endpoints() {
        let openai = OpenAiCompatModel::new(OpenAiCompatModelConfig::openai("k", "gpt-4o"))
            .expect("client builds");
        assert_eq!(openai.endpoint(), "https://api.openai.com/v1/chat/completions");

        let xai = OpenAiCompatModel::new(OpenAiCompatModelConfig::xai("k", "grok-4"))
            .expect("client builds");
        assert_eq!(xai.endpoint(), "https://api.x.ai/v1/chat/completions");
    }

    #[test]
    fn history_replays_tool_calls_and_results() {
        let history = vec![
            ChatMessage::System("You are a helpful assistant".to_string()),
            ChatMessage::User("Weather in Boston?".to_string()),
            ChatMessage::Assistant(AssistantTurn {
                text: None,
                tool_calls: vec![ToolCall::new("call_1", "get_weather", json!({"city": "Boston"}))],
            }),
            ChatMessage::Tool(ToolReply {
                call_id: "call_1".to_string(),
                tool: "get_weather".to_string(),
                content: "{\"status\":\"unsupported\"}".to_string(),
                is_error: false,
            }),
            ChatMessage::Assistant(AssistantTurn::default()),
        ];

        let value = request_json(&history, &OpenAiCompatModelConfig::openai("key", "gpt-4o"));
        let messages = value["messages"].as_array().expect("messages");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(
            messages[2]["tool_calls"][0]["function"]["arguments"],
            "{\"city\":\"Boston\"}"
        );
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "get_weather");
    }

    #[test]
    fn response_tool_calls_are_decoded() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "call_x",
                        "type": "function",
                        "function": {"name": "get_stock_price", "arguments": "{\"ticker\":\"MSFT\"}"}
                    }],
                    "reasoning_content": "look up MSFT"
                }
            }],
            "usage": {"prompt_tokens": 30, "completion_tokens": 6}
        }))
        .expect("response parses");

        let completion = to_completion("openai", response).expect("completion");

        assert!(completion.text.is_none());
        assert_eq!(completion.thinking.as_deref(), Some("look up MSFT"));
        assert_eq!(
            completion.tool_calls,
            vec![ToolCall::new("call_x", "get_stock_price", json!({"ticker": "MSFT"}))]
        );
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                input_tokens: 30,
                output_tokens: 6,
            })
        );
    }

    #[test]
    fn missing_choices_and_bad_arguments_are_rejected() {
        let empty: ChatResponse = serde_json::from_value(json!({"choices": []})).expect("parses");
        let err = to_completion("xai", empty).expect_err("no choices");
        assert!(err.to_string().contains("xai returned no choices"));

        let garbled: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{"id": "c", "function": {"name": "get_weather", "arguments": "{city"}}]
                }
            }]
        }))
        .expect("parses");
        let err = to_completion("xai", garbled).expect_err("bad arguments");
        assert!(err.to_string().contains("unparseable arguments for get_weather"));
    }
}
