//! Line-oriented conversation loop shared by every example app.

use futures_util::{StreamExt, pin_mut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::agent::AgentEvent;
use crate::apps::App;

const PREVIEW_LIMIT: usize = 160;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Print a line for every tool call and result.
    pub show_tools: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Quit,
    Clear,
    Skip,
    Ask(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Skip;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => Command::Quit,
        "clear" => Command::Clear,
        _ => Command::Ask(trimmed.to_string()),
    }
}

/// Runs the app until the user quits or `input` is exhausted.
///
/// A failed turn is reported on `output` and the loop keeps going; only I/O
/// errors on the streams themselves end the session early.
pub async fn run<R, W>(
    app: &mut App,
    input: R,
    output: &mut W,
    options: RunnerOptions,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_banner(app, output).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"You: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };

        match parse_command(&line) {
            Command::Skip => continue,
            Command::Quit => break,
            Command::Clear => {
                app.agent_mut().clear_history();
                output.write_all(b"Conversation cleared.\n\n").await?;
            }
            Command::Ask(message) => run_turn(app, message, output, options).await?,
        }
    }

    output.write_all(b"Goodbye!\n").await?;
    output.flush().await
}

async fn write_banner<W>(app: &App, output: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let rule = "=".repeat(60);
    let mut banner = format!("{rule}\n{}\n{rule}\n", app.banner);
    if !app.sample_prompts.is_empty() {
        banner.push_str("\nTry asking:\n");
        for prompt in app.sample_prompts {
            banner.push_str(&format!("  - {prompt}\n"));
        }
    }
    banner.push_str("\nType 'quit' to exit, 'clear' to start over.\n\n");
    output.write_all(banner.as_bytes()).await
}

async fn run_turn<W>(
    app: &mut App,
    message: String,
    output: &mut W,
    options: RunnerOptions,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(b"\nAssistant: ").await?;
    output.flush().await?;

    let mut printed_text = false;
    let stream = app.agent_mut().query_stream(message);
    pin_mut!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(AgentEvent::Text { content }) => {
                output.write_all(content.as_bytes()).await?;
                output.flush().await?;
                printed_text = true;
            }
            Ok(AgentEvent::FinalResponse { content }) => {
                if !printed_text {
                    output.write_all(content.as_bytes()).await?;
                }
            }
            Ok(AgentEvent::ToolCall {
                tool, arguments, ..
            }) if options.show_tools => {
                let line = format!(
                    "\n  [tool] {tool}({})\n",
                    preview(&arguments.to_string())
                );
                output.write_all(line.as_bytes()).await?;
            }
            Ok(AgentEvent::ToolResult {
                tool,
                content,
                is_error,
                ..
            }) if options.show_tools => {
                let marker = if is_error { "error" } else { "ok" };
                let line = format!("  [{marker}] {tool} -> {}\n", preview(&content));
                output.write_all(line.as_bytes()).await?;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "turn failed");
                output.write_all(format!("\nError: {err}").as_bytes()).await?;
                break;
            }
        }
    }

    output.write_all(b"\n\n").await?;
    output.flush().await
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agent::Agent;
    use crate::error::ProviderError;
    use crate::llm::{ChatMessage, ChatModel, Completion, ToolCall, ToolDeclaration};
    use crate::tools::weather::weather_tool;

    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<Completion, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            _history: &[ChatMessage],
            _tools: &[ToolDeclaration],
        ) -> Result<Completion, ProviderError> {
            self.replies
                .lock()
                .expect("lock poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Malformed("script exhausted".to_string())))
        }
    }

    fn text(content: &str) -> Result<Completion, ProviderError> {
        Ok(Completion {
            text: Some(content.to_string()),
            ..Completion::default()
        })
    }

    fn app(replies: Vec<Result<Completion, ProviderError>>) -> App {
        let agent = Agent::builder()
            .name("assistant")
            .model(ScriptedModel::new(replies))
            .tool(weather_tool())
            .build()
            .expect("agent builds");
        App {
            name: "test_app",
            banner: "Test Ready!",
            sample_prompts: &["What's the weather in Chicago?"],
            agent,
        }
    }

    async fn drive(app: &mut App, input: &str, options: RunnerOptions) -> String {
        let mut output = Vec::new();
        run(app, input.as_bytes(), &mut output, options)
            .await
            .expect("in-memory io");
        String::from_utf8(output).expect("utf8 output")
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(parse_command("  QUIT "), Command::Quit);
        assert_eq!(parse_command("Exit"), Command::Quit);
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command("Clear"), Command::Clear);
        assert_eq!(parse_command("   "), Command::Skip);
        assert_eq!(
            parse_command(" hello "),
            Command::Ask("hello".to_string())
        );
    }

    #[tokio::test]
    async fn prints_banner_and_answers() {
        let mut app = app(vec![text("Hi there!")]);
        let output = drive(&mut app, "hello\nquit\n", RunnerOptions::default()).await;

        assert!(output.contains("Test Ready!"));
        assert!(output.contains("  - What's the weather in Chicago?"));
        assert!(output.contains("You: \nAssistant: Hi there!\n\n"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped_and_eof_ends_the_loop() {
        let mut app = app(vec![text("one")]);
        let output = drive(&mut app, "\n   \nfirst", RunnerOptions::default()).await;

        assert_eq!(output.matches("Assistant: ").count(), 1);
        assert!(output.contains("Assistant: one"));
        assert!(output.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn failed_turn_is_reported_and_loop_continues() {
        let mut app = app(vec![
            Err(ProviderError::Transport("rate limited".to_string())),
            text("recovered"),
        ]);
        let output = drive(&mut app, "first\nsecond\nexit\n", RunnerOptions::default()).await;

        assert!(output.contains("Error: could not reach provider: rate limited"));
        assert!(output.contains("Assistant: recovered"));
    }

    #[tokio::test]
    async fn clear_resets_history() {
        let mut app = app(vec![text("first answer")]);
        let output = drive(&mut app, "hello\nclear\n", RunnerOptions::default()).await;

        assert!(output.contains("Conversation cleared."));
        assert_eq!(app.agent.messages_len(), 0);
    }

    #[tokio::test]
    async fn tool_lines_only_when_enabled() {
        let call = || {
            Ok(Completion {
                tool_calls: vec![ToolCall::new(
                    "call_1",
                    "get_weather",
                    json!({"city": "Chicago"}),
                )],
                ..Completion::default()
            })
        };

        let mut quiet = app(vec![call(), text("Cold and windy.")]);
        let output = drive(&mut quiet, "weather?\n", RunnerOptions::default()).await;
        assert!(!output.contains("[tool]"));
        assert!(output.contains("Assistant: Cold and windy."));

        let mut verbose = app(vec![call(), text("Cold and windy.")]);
        let output = drive(
            &mut verbose,
            "weather?\n",
            RunnerOptions { show_tools: true },
        )
        .await;
        assert!(output.contains("[tool] get_weather({\"city\":\"Chicago\"})"));
        assert!(output.contains("[ok] get_weather -> "));
        assert!(output.contains("28°F"));
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        let long = "°".repeat(PREVIEW_LIMIT + 5);
        let cut = preview(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_LIMIT + 3);
    }
}
