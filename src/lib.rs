//! Example agents on a small, provider-agnostic agent runtime.
//!
//! - `Agent` loop with tool dispatch, `query` and `query_stream` entry points
//! - Tool registry with JSON schema validation and dependency injection
//! - Provider adapters for Gemini, Anthropic, OpenAI and xAI behind `ChatModel`,
//!   chosen at runtime with a `<provider>/<model>` selector
//! - Agents exposed as tools of other agents via `agent_tool`
//! - Two ready-made apps (`travel`, `assistant`) and the interactive runner that drives them

pub mod agent;
pub mod apps;
pub mod config;
pub mod error;
pub mod llm;
pub mod runner;
pub mod tools;

pub use agent::{Agent, AgentBuilder, AgentEvent, AgentProfile};
pub use config::Settings;
pub use error::{AgentError, ProviderError, SchemaError, SettingsError, ToolError};
pub use llm::{
    AnthropicModel, AnthropicModelConfig, AssistantTurn, ChatMessage, ChatModel, Completion,
    GoogleModel, GoogleModelConfig, ModelSelector, OpenAiCompatModel, OpenAiCompatModelConfig,
    Provider, TokenLimitParam, TokenUsage, ToolCall, ToolDeclaration, ToolReply,
};
pub use tools::{Dependencies, ToolOutcome, ToolSpec, agent_tool};
