use std::sync::Arc;

use crate::agent::Agent;
use crate::apps::App;
use crate::config::Settings;
use crate::error::AgentError;
use crate::llm::ChatModel;
use crate::tools::stocks::stock_price_tool;
use crate::tools::weather::weather_tool;

pub const APP_NAME: &str = "model_agnostic_agent";

const INSTRUCTION: &str = "You are a helpful assistant that can:
- Answer questions using your knowledge
- Get weather information for any city using get_weather tool
- Get stock prices for any ticker symbol using get_stock_price tool

Be concise and helpful in your responses.";

const SAMPLE_PROMPTS: &[&str] = &[
    "What's the weather in Chicago?",
    "How much is a share of MSFT?",
    "Compare AAPL and GOOGL prices",
];

/// Builds the assistant on the model named by `settings`.
pub fn build(settings: &Settings) -> Result<App, AgentError> {
    let model = settings.model.build()?;
    with_model(model, settings.max_iterations)
}

pub fn with_model(model: Arc<dyn ChatModel>, max_iterations: u32) -> Result<App, AgentError> {
    let agent = Agent::builder()
        .name("assistant")
        .instruction(INSTRUCTION)
        .shared_model(model)
        .tool(weather_tool())
        .tool(stock_price_tool())
        .max_iterations(max_iterations)
        .build()?;

    Ok(App {
        name: APP_NAME,
        banner: "Assistant Ready!",
        sample_prompts: SAMPLE_PROMPTS,
        agent,
    })
}
