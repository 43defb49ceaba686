//! The agent loop: send history to the model, run the tools it asks for, feed
//! the results back, and stop once it answers without calling anything.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt, pin_mut};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{
    AssistantTurn, ChatMessage, ChatModel, TokenUsage, ToolCall, ToolDeclaration, ToolReply,
};
use crate::tools::{Dependencies, ToolSpec};

pub const DEFAULT_MAX_ITERATIONS: u32 = 24;

/// Identity and limits of an agent, independent of its model and tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    /// Shown to a parent agent when this agent is exposed as a tool.
    pub description: Option<String>,
    /// Seeded as the system message of a fresh conversation.
    pub instruction: Option<String>,
    /// Model calls allowed per user turn.
    pub max_iterations: u32,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            description: None,
            instruction: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// What a running turn reports, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Thinking {
        content: String,
    },
    Text {
        content: String,
    },
    ToolCall {
        tool: String,
        arguments: Value,
        call_id: String,
    },
    ToolResult {
        tool: String,
        content: String,
        call_id: String,
        is_error: bool,
    },
    FinalResponse {
        content: String,
    },
}

/// Blueprint for an [`Agent`]. A builder can be cloned and built repeatedly;
/// every build starts with an empty history.
#[derive(Clone, Default)]
pub struct AgentBuilder {
    profile: AgentProfile,
    model: Option<Arc<dyn ChatModel>>,
    tools: Vec<ToolSpec>,
    dependencies: Dependencies,
}

impl AgentBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.profile.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.profile.description = Some(description.into());
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.profile.instruction = Some(instruction.into());
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.profile.max_iterations = max_iterations;
        self
    }

    pub fn model<M: ChatModel + 'static>(self, model: M) -> Self {
        self.shared_model(Arc::new(model))
    }

    pub fn shared_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    /// Makes `value` available to this agent's tool handlers.
    pub fn dependency<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.dependencies.insert(value);
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let name = &self.profile.name;
        let model = self
            .model
            .ok_or_else(|| AgentError::Misconfigured(format!("agent '{name}' has no model")))?;

        for (index, tool) in self.tools.iter().enumerate() {
            if self.tools[..index].iter().any(|earlier| earlier.name() == tool.name()) {
                return Err(AgentError::Misconfigured(format!(
                    "agent '{name}' registers '{}' twice",
                    tool.name()
                )));
            }
        }

        let declarations = self.tools.iter().map(ToolSpec::declaration).collect();
        Ok(Agent {
            profile: self.profile,
            model,
            tools: self.tools,
            declarations,
            dependencies: self.dependencies,
            history: Vec::new(),
            usage: TokenUsage::default(),
        })
    }
}

/// A conversation with one model and a fixed set of tools.
pub struct Agent {
    profile: AgentProfile,
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSpec>,
    declarations: Vec<ToolDeclaration>,
    dependencies: Dependencies,
    history: Vec<ChatMessage>,
    usage: TokenUsage,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(ToolSpec::name)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn messages_len(&self) -> usize {
        self.history.len()
    }

    /// Tokens reported by the provider across every call so far.
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    /// Runs one user turn to completion and returns the final answer.
    pub async fn query(&mut self, message: impl Into<String>) -> Result<String, AgentError> {
        let events = self.query_stream(message);
        pin_mut!(events);

        let mut answer = None;
        while let Some(event) = events.next().await {
            if let AgentEvent::FinalResponse { content } = event? {
                answer = Some(content);
            }
        }
        answer.ok_or(AgentError::NoFinalResponse)
    }

    /// Runs one user turn, yielding events as they happen. The stream ends
    /// after [`AgentEvent::FinalResponse`] or the first error.
    pub fn query_stream(
        &mut self,
        message: impl Into<String>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + '_ {
        let message = message.into();

        try_stream! {
            if self.history.is_empty() {
                if let Some(instruction) = self.profile.instruction.clone() {
                    self.history.push(ChatMessage::System(instruction));
                }
            }
            self.history.push(ChatMessage::User(message));

            let limit = self.profile.max_iterations;
            let mut calls = 0;
            loop {
                if calls == limit {
                    warn!(agent = %self.profile.name, limit, "iteration limit reached");
                    Err::<(), AgentError>(AgentError::IterationLimit { limit })?;
                }
                calls += 1;
                debug!(agent = %self.profile.name, call = calls, history = self.history.len(), "calling model");

                let completion = self.model.complete(&self.history, &self.declarations).await?;
                if let Some(usage) = completion.usage {
                    self.usage += usage;
                }

                if let Some(content) = completion.thinking {
                    yield AgentEvent::Thinking { content };
                }
                if let Some(content) = completion.text.clone().filter(|text| !text.is_empty()) {
                    yield AgentEvent::Text { content };
                }

                self.history.push(ChatMessage::Assistant(AssistantTurn {
                    text: completion.text.clone(),
                    tool_calls: completion.tool_calls.clone(),
                }));

                if completion.tool_calls.is_empty() {
                    yield AgentEvent::FinalResponse {
                        content: completion.text.unwrap_or_default(),
                    };
                    break;
                }

                for call in completion.tool_calls {
                    yield AgentEvent::ToolCall {
                        tool: call.name.clone(),
                        arguments: call.arguments.clone(),
                        call_id: call.id.clone(),
                    };

                    let reply = self.run_tool(&call).await;
                    self.history.push(ChatMessage::Tool(reply.clone()));

                    yield AgentEvent::ToolResult {
                        tool: reply.tool,
                        content: reply.content,
                        call_id: reply.call_id,
                        is_error: reply.is_error,
                    };
                }
            }
        }
    }

    /// Runs one requested call. Failures become error replies for the model
    /// rather than ending the turn.
    async fn run_tool(&self, call: &ToolCall) -> ToolReply {
        let reply = |content: String, is_error| ToolReply {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            content,
            is_error,
        };

        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.name) else {
            warn!(agent = %self.profile.name, tool = %call.name, "model asked for an unknown tool");
            return reply(format!("Unknown tool '{}'.", call.name), true);
        };

        debug!(agent = %self.profile.name, tool = %call.name, arguments = %call.arguments, "running tool");
        match tool.call(call.arguments.clone(), &self.dependencies).await {
            Ok(outcome) => reply(outcome.into_text(), false),
            Err(err) => {
                warn!(agent = %self.profile.name, tool = %call.name, error = %err, "tool failed");
                reply(err.to_string(), true)
            }
        }
    }
}
