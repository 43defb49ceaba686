use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ProviderError;
use crate::llm::{
    ChatMessage, ChatModel, Completion, TokenUsage, ToolCall, ToolDeclaration, api_failure,
    http_client, joined, system_prompt,
};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone)]
pub struct GoogleModelConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: Option<String>,
    pub max_output_tokens: Option<u32>,
    /// Lets Gemini ground answers with Google Search results.
    pub google_search: bool,
}

impl GoogleModelConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base_url: None,
            max_output_tokens: Some(4096),
            google_search: false,
        }
    }
}

/// Gemini through the `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GoogleModel {
    client: Client,
    config: GoogleModelConfig,
}

impl GoogleModel {
    pub fn new(config: GoogleModelConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    /// Reads `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
    pub fn config_from_env(model: impl Into<String>) -> Result<GoogleModelConfig, ProviderError> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|key| std::env::var(key).ok())
            .ok_or(ProviderError::MissingCredentials("GOOGLE_API_KEY (or GEMINI_API_KEY)"))?;
        Ok(GoogleModelConfig::new(api_key, model))
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(Self::config_from_env(model)?)
    }

    pub fn config(&self) -> &GoogleModelConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base_url.as_deref().unwrap_or(API_BASE_URL);
        format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ChatModel for GoogleModel {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Completion, ProviderError> {
        let request = build_request(history, tools, &self.config);
        tracing::debug!(
            model = %self.config.model,
            history = history.len(),
            google_search = self.config.google_search,
            "gemini request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(api_failure("gemini", response).await);
        }

        let body = response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        to_completion(body)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolGroup>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum ToolGroup {
    FunctionDeclarations(Vec<FunctionDeclaration>),
    GoogleSearch(Map<String, Value>),
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    thoughts_token_count: u32,
}

fn build_request(
    history: &[ChatMessage],
    tools: &[ToolDeclaration],
    config: &GoogleModelConfig,
) -> GenerateRequest {
    let mut groups = Vec::new();
    if !tools.is_empty() {
        groups.push(ToolGroup::FunctionDeclarations(
            tools
                .iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: without_unsupported_keywords(tool.parameters.clone()),
                })
                .collect(),
        ));
    }
    if config.google_search {
        groups.push(ToolGroup::GoogleSearch(Map::new()));
    }

    GenerateRequest {
        contents: to_contents(history),
        system_instruction: system_prompt(history).map(|prompt| Content {
            role: None,
            parts: vec![Part::text(prompt)],
        }),
        tools: groups,
        generation_config: GenerationConfig {
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// Replays history as Gemini contents. Function calls carry their thought
/// signature back unchanged; responses to one batch of calls share a turn.
fn to_contents(history: &[ChatMessage]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::new();

    for entry in history {
        match entry {
            ChatMessage::System(_) => {}
            ChatMessage::User(text) => {
                contents.push(Content::new("user", vec![Part::text(text.clone())]));
            }
            ChatMessage::Assistant(turn) => {
                let mut parts = turn
                    .text
                    .iter()
                    .filter(|text| !text.is_empty())
                    .map(|text| Part::text(text.clone()))
                    .collect::<Vec<_>>();
                parts.extend(turn.tool_calls.iter().map(|call| Part {
                    thought_signature: call.signature.clone(),
                    function_call: Some(FunctionCall {
                        id: Some(call.id.clone()),
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    }),
                    ..Part::default()
                }));
                if !parts.is_empty() {
                    contents.push(Content::new("model", parts));
                }
            }
            ChatMessage::Tool(reply) => {
                let part = Part {
                    function_response: Some(FunctionResponse {
                        id: Some(reply.call_id.clone()),
                        name: reply.tool.clone(),
                        response: response_object(&reply.content, reply.is_error),
                    }),
                    ..Part::default()
                };
                match contents.last_mut() {
                    Some(last) if last.parts.iter().all(|part| part.function_response.is_some()) => {
                        last.parts.push(part);
                    }
                    _ => contents.push(Content::new("user", vec![part])),
                }
            }
        }
    }

    contents
}

// functionResponse.response must be an object.
fn response_object(content: &str, is_error: bool) -> Value {
    if is_error {
        return json!({ "error": content });
    }
    match serde_json::from_str::<Value>(content) {
        Ok(object @ Value::Object(_)) => object,
        _ => json!({ "result": content }),
    }
}

fn to_completion(response: GenerateResponse) -> Result<Completion, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("gemini returned no candidates".to_string()))?;

    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    if parts.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|reason| reason != "STOP") {
            return Err(ProviderError::Malformed(format!(
                "gemini returned no content (finish reason {reason})"
            )));
        }
    }

    let mut text = Vec::new();
    let mut thinking = Vec::new();
    let mut tool_calls = Vec::new();

    for part in parts {
        match (part.text, part.function_call) {
            (_, Some(call)) => {
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}", tool_calls.len() + 1));
                let arguments = match call.args {
                    Value::Null => json!({}),
                    args => args,
                };
                tool_calls.push(ToolCall {
                    id,
                    name: call.name,
                    arguments,
                    signature: part.thought_signature,
                });
            }
            (Some(part_text), None) if part.thought => thinking.push(part_text),
            (Some(part_text), None) => text.push(part_text),
            (None, None) => {}
        }
    }

    Ok(Completion {
        text: joined(text),
        thinking: joined(thinking),
        tool_calls,
        usage: response.usage_metadata.map(|usage| TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage
                .candidates_token_count
                .saturating_add(usage.thoughts_token_count),
        }),
    })
}

/// Gemini's schema dialect rejects `additionalProperties` and `default`.
fn without_unsupported_keywords(schema: Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| key != "additionalProperties" && key != "default")
                .map(|(key, value)| (key, without_unsupported_keywords(value)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(without_unsupported_keywords).collect())
        }
        other => other,
    }
}
