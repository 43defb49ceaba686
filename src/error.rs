use thiserror::Error;

/// A tool's parameter schema was rejected at registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("parameter schema is not a JSON object")]
    NotAnObject,
    #[error("parameter schema root must have \"type\": \"object\"")]
    RootNotObjectType,
    #[error("\"required\" must list property names as strings")]
    RequiredNotStrings,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("bad arguments for {tool}: {reason}")]
    BadArguments { tool: String, reason: String },
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not set")]
    MissingCredentials(&'static str),
    #[error("could not reach provider: {0}")]
    Transport(String),
    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("unexpected provider response: {0}")]
    Malformed(String),
}

/// Errors raised while resolving runtime settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid model selector '{0}': expected <provider>/<model>")]
    InvalidModelSelector(String),
    #[error("unknown model provider '{0}' (expected gemini, anthropic, openai or xai)")]
    UnknownProvider(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("gave up after {limit} model calls without a final answer")]
    IterationLimit { limit: u32 },
    #[error("turn ended without a final response")]
    NoFinalResponse,
    #[error("misconfigured agent: {0}")]
    Misconfigured(String),
}
