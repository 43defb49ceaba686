use std::error::Error;

use agent_examples::apps::{App, assistant, travel};
use agent_examples::config::Settings;
use agent_examples::llm::ModelSelector;
use agent_examples::runner::{self, RunnerOptions};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agent-examples")]
#[command(about = "Interactive agent examples backed by a swappable LLM provider")]
#[command(version)]
struct Cli {
    /// Model selector as <provider>/<model>; overrides AGENT_MODEL
    #[arg(long, global = true)]
    model: Option<ModelSelector>,

    /// Print tool calls and results as they happen
    #[arg(long, global = true)]
    show_tools: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Travel assistant with flight status, hotel search and web research
    Travel,
    /// General assistant with weather and stock price tools
    Assistant,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env(cli.model)?;

    println!("Using model: {}", settings.model);

    let mut app: App = match cli.command {
        Command::Travel => travel::build(&settings)?,
        Command::Assistant => assistant::build(&settings)?,
    };

    tracing::info!(app = app.name, "starting interactive session");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    runner::run(
        &mut app,
        stdin,
        &mut stdout,
        RunnerOptions {
            show_tools: cli.show_tools,
        },
    )
    .await?;

    Ok(())
}
