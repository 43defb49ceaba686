//! Runtime settings.
//!
//! Read from the environment (after loading `.env` when present):
//! - `AGENT_MODEL` - optional `<provider>/<model>` selector. Defaults to
//!   `gemini/gemini-3-flash-preview`. `LITELLM_MODEL` is read when it is unset.
//!   A selector given on the command line wins and neither variable is parsed.
//! - `AGENT_MAX_ITERATIONS` - optional positive cap on model calls per turn.
//!   Defaults to `24`.
//!
//! Provider API keys are read by the adapters themselves when the model is built.

use crate::agent::DEFAULT_MAX_ITERATIONS;
use crate::error::SettingsError;
use crate::llm::ModelSelector;

pub const MODEL_ENV_VAR: &str = "AGENT_MODEL";
/// Older name for [`MODEL_ENV_VAR`], still honoured.
pub const LEGACY_MODEL_ENV_VAR: &str = "LITELLM_MODEL";
pub const MAX_ITERATIONS_ENV_VAR: &str = "AGENT_MAX_ITERATIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model: ModelSelector,
    pub max_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelSelector::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then resolves settings from the process
    /// environment. `model_override` comes from the command line.
    pub fn from_env(model_override: Option<ModelSelector>) -> Result<Self, SettingsError> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!(error = %err, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok(), model_override)
    }

    /// Resolves settings through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(
        lookup: F,
        model_override: Option<ModelSelector>,
    ) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model = match model_override {
            Some(model) => model,
            None => match read(MODEL_ENV_VAR).or_else(|| read(LEGACY_MODEL_ENV_VAR)) {
                Some(selector) => selector.parse()?,
                None => ModelSelector::default(),
            },
        };

        let max_iterations = match read(MAX_ITERATIONS_ENV_VAR) {
            Some(raw) => parse_max_iterations(&raw)?,
            None => DEFAULT_MAX_ITERATIONS,
        };

        tracing::info!(model = %model, max_iterations, "resolved settings");

        Ok(Self {
            model,
            max_iterations,
        })
    }
}

fn parse_max_iterations(raw: &str) -> Result<u32, SettingsError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(SettingsError::InvalidValue {
            key: MAX_ITERATIONS_ENV_VAR,
            value: raw.to_string(),
        }),
    }
}
