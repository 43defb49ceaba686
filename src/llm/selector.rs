use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ProviderError, SettingsError};
use crate::llm::{AnthropicModel, ChatModel, GoogleModel, OpenAiCompatModel};

/// Selector used when nothing is configured.
pub const DEFAULT_MODEL: &str = "gemini/gemini-3-flash-preview";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Anthropic,
    OpenAi,
    Xai,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Xai => "xai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "anthropic" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "xai" | "grok" => Ok(Provider::Xai),
            _ => Err(SettingsError::UnknownProvider(value.to_string())),
        }
    }
}

/// A `<provider>/<model>` string naming the backend an agent talks to,
/// e.g. `gemini/gemini-3-flash-preview` or `anthropic/claude-sonnet-4-5`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelSelector {
    provider: Provider,
    model: String,
}

impl ModelSelector {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Builds the provider adapter, reading its API key from the environment.
    pub fn build(&self) -> Result<Arc<dyn ChatModel>, ProviderError> {
        let model: Arc<dyn ChatModel> = match self.provider {
            Provider::Gemini => Arc::new(GoogleModel::from_env(&self.model)?),
            Provider::Anthropic => Arc::new(AnthropicModel::from_env(&self.model)?),
            Provider::OpenAi => Arc::new(OpenAiCompatModel::openai_from_env(&self.model)?),
            Provider::Xai => Arc::new(OpenAiCompatModel::xai_from_env(&self.model)?),
        };
        Ok(model)
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        DEFAULT_MODEL
            .parse()
            .unwrap_or_else(|_| ModelSelector::new(Provider::Gemini, "gemini-3-flash-preview"))
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for ModelSelector {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let Some((provider, model)) = trimmed.split_once('/') else {
            return Err(SettingsError::InvalidModelSelector(value.to_string()));
        };
        if model.trim().is_empty() {
            return Err(SettingsError::InvalidModelSelector(value.to_string()));
        }

        Ok(Self::new(provider.parse()?, model.trim()))
    }
}
