use serde::Deserialize;
use serde_json::json;

use crate::agent::AgentBuilder;
use crate::error::{AgentError, ToolError};
use crate::tools::{ToolOutcome, ToolSpec, parse_args};

#[derive(Debug, Deserialize)]
struct DelegatedRequest {
    request: String,
}

/// Wraps an agent blueprint as a tool carrying the agent's name.
///
/// Each call builds a new agent from `blueprint`, so delegated runs start with
/// an empty history. The tool returns the delegate's final answer as text.
pub fn agent_tool(blueprint: AgentBuilder) -> Result<ToolSpec, AgentError> {
    let profile = blueprint.profile();
    let name = profile.name.trim().to_string();
    if name.is_empty() {
        return Err(AgentError::Misconfigured(
            "an agent used as a tool must be named".to_string(),
        ));
    }

    let description = profile
        .description
        .clone()
        .unwrap_or_else(|| format!("Hand a request to the {name} agent"));

    let delegate = name.clone();
    let spec = ToolSpec::new(name, description)
        .with_schema(json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "What the agent should do, in plain language"
                }
            },
            "required": ["request"],
            "additionalProperties": false
        }))?
        .with_handler(move |args, _deps| {
            let blueprint = blueprint.clone();
            let delegate = delegate.clone();
            async move {
                let DelegatedRequest { request } = parse_args(&delegate, args)?;
                let mut agent = blueprint
                    .build()
                    .map_err(|err| ToolError::Failed(err.to_string()))?;

                tracing::debug!(agent = %delegate, "delegating request");

                match agent.query(request).await {
                    Ok(answer) => Ok(ToolOutcome::Text(answer)),
                    Err(err) => Err(ToolError::Failed(format!("{delegate} failed: {err}"))),
                }
            }
        });

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::ProviderError;
    use crate::llm::{ChatMessage, ChatModel, Completion, ToolDeclaration};
    use crate::tools::Dependencies;

    /// Answers with the latest user message and records each history length.
    #[derive(Default)]
    struct Researcher {
        history_lengths: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatModel for Researcher {
        async fn complete(
            &self,
            history: &[ChatMessage],
            _tools: &[ToolDeclaration],
        ) -> Result<Completion, ProviderError> {
            self.history_lengths
                .lock()
                .expect("lock poisoned")
                .push(history.len());
            let request = history
                .iter()
                .rev()
                .find_map(|message| match message {
                    ChatMessage::User(text) => Some(text.as_str()),
                    _ => None,
                })
                .unwrap_or_default();
            Ok(Completion {
                text: Some(format!("Found: {request}")),
                ..Completion::default()
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl ChatModel for Unreachable {
        async fn complete(
            &self,
            _history: &[ChatMessage],
            _tools: &[ToolDeclaration],
        ) -> Result<Completion, ProviderError> {
            Err(ProviderError::Api {
                provider: "gemini",
                status: 429,
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn web_search(model: Arc<dyn ChatModel>) -> AgentBuilder {
        AgentBuilder::default()
            .name("web_search")
            .description("Search the web for real-time travel information")
            .instruction("You research travel questions.")
            .shared_model(model)
    }

    #[tokio::test]
    async fn delegated_runs_do_not_share_history() {
        let model = Arc::new(Researcher::default());
        let tool = agent_tool(web_search(model.clone())).expect("tool builds");
        assert_eq!(tool.name(), "web_search");
        assert_eq!(
            tool.description(),
            "Search the web for real-time travel information"
        );

        let deps = Dependencies::new();
        for topic in ["events in Tokyo", "museums in Paris"] {
            let outcome = tool
                .call(json!({"request": topic}), &deps)
                .await
                .expect("delegate answers");
            assert_eq!(outcome, ToolOutcome::Text(format!("Found: {topic}")));
        }

        // instruction and request only, both times
        assert_eq!(
            *model.history_lengths.lock().expect("lock poisoned"),
            vec![2, 2]
        );
    }

    #[tokio::test]
    async fn delegate_failures_name_the_agent() {
        let err = agent_tool(web_search(Arc::new(Unreachable)))
            .expect("tool builds")
            .call(json!({"request": "events in London"}), &Dependencies::new())
            .await
            .expect_err("provider failure surfaces");

        assert_eq!(
            err.to_string(),
            "web_search failed: gemini returned HTTP 429: quota exceeded"
        );
    }

    #[tokio::test]
    async fn request_argument_is_required() {
        let err = agent_tool(web_search(Arc::new(Researcher::default())))
            .expect("tool builds")
            .call(json!({"query": "hotels"}), &Dependencies::new())
            .await
            .expect_err("request is required");
        assert!(err.to_string().starts_with("bad arguments for web_search"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = agent_tool(AgentBuilder::default().name(" ")).expect_err("needs a name");
        assert!(matches!(err, AgentError::Misconfigured(_)));
    }

    #[test]
    fn description_defaults_to_the_agent_name() {
        let tool = agent_tool(AgentBuilder::default().name("concierge")).expect("tool builds");
        assert_eq!(tool.description(), "Hand a request to the concierge agent");
    }
}
