//! Provider-neutral conversation types and the [`ChatModel`] seam the agent
//! loop drives. Each adapter translates these to and from one vendor's wire
//! format.

mod anthropic;
mod google;
mod openai_compat;
mod selector;

use std::ops::AddAssign;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;

pub use anthropic::{AnthropicModel, AnthropicModelConfig};
pub use google::{GoogleModel, GoogleModelConfig};
pub use openai_compat::{OpenAiCompatModel, OpenAiCompatModelConfig, TokenLimitParam};
pub use selector::{DEFAULT_MODEL, ModelSelector, Provider};

/// One entry of the history an agent keeps and replays on every call.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant(AssistantTurn),
    Tool(ToolReply),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// The outcome of one tool call, as fed back to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolReply {
    pub call_id: String,
    pub tool: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolReply {
    /// Content for wire formats without a separate error flag.
    pub fn flagged_content(&self) -> String {
        if self.is_error {
            format!("Error: {}", self.content)
        } else {
            self.content.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Opaque token some providers attach to a call and require back verbatim
    /// when the call is replayed (Gemini thought signatures).
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            signature: None,
        }
    }
}

/// A tool as advertised to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub thinking: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// A chat backend the agent loop can drive.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<Completion, ProviderError>;
}

/// System messages folded into one prompt, for APIs that take it out of band.
fn system_prompt(history: &[ChatMessage]) -> Option<String> {
    let lines = history
        .iter()
        .filter_map(|message| match message {
            ChatMessage::System(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    (!lines.is_empty()).then(|| lines.join("\n\n"))
}

fn joined(parts: Vec<String>) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join("\n"))
}

fn http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .build()
        .map_err(|err| ProviderError::Transport(err.to_string()))
}

/// Turns a non-2xx response into [`ProviderError::Api`]. Both Gemini and the
/// chat-completions APIs wrap failures as `{"error": {"message": ...}}`.
async fn api_failure(provider: &'static str, response: reqwest::Response) -> ProviderError {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }

    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Envelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body,
    };

    tracing::warn!(provider, status, %message, "provider rejected request");

    ProviderError::Api {
        provider,
        status,
        message,
    }
}
