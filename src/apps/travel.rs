use std::sync::Arc;

use tracing::warn;

use crate::agent::{Agent, AgentBuilder};
use crate::apps::App;
use crate::config::Settings;
use crate::error::AgentError;
use crate::llm::{ChatModel, GoogleModel, Provider};
use crate::tools::agent_tool;
use crate::tools::flights::flight_status_tool;
use crate::tools::hotels::hotel_search_tool;

pub const APP_NAME: &str = "travel_assistant";
pub const SEARCH_AGENT_NAME: &str = "web_search";

const SEARCH_INSTRUCTION: &str = "You are a travel research specialist. Search for:
- Weather conditions and forecasts
- Local events and festivals
- Travel advisories and visa requirements
- Popular attractions and restaurants

Provide concise, helpful information.";

const INSTRUCTION: &str = "You are a helpful travel assistant that helps users plan trips.

You can help with:
1. **Flight Status** - Check if flights are on time, delayed, or boarding
2. **Hotel Search** - Find available hotels in Paris, Tokyo, or London
3. **Travel Research** - Search the web for weather, events, attractions, and travel tips

Guidelines:
- Always use tools to look up information - don't make up data
- For flight status, ask for the flight number if not provided
- When showing hotels, highlight price, rating, and key amenities
- Use web search for current weather, events, or destination tips

Sample flight numbers for testing: AA123, UA456, DL789
Sample cities with hotels: Paris, Tokyo, London";

const SAMPLE_PROMPTS: &[&str] = &[
    "What's the status of flight AA123?",
    "Find hotels in Paris for March 15-20, 2026",
    "What's the weather like in Tokyo?",
];

/// Builds the travel assistant on the model named by `settings`.
///
/// Gemini grounds the research agent with Google Search. Other providers have
/// no equivalent built-in tool, so research falls back to model knowledge.
pub fn build(settings: &Settings) -> Result<App, AgentError> {
    let root_model = settings.model.build()?;

    let search_model: Arc<dyn ChatModel> = match settings.model.provider() {
        Provider::Gemini => {
            let mut config = GoogleModel::config_from_env(settings.model.model())?;
            config.google_search = true;
            Arc::new(GoogleModel::new(config)?)
        }
        provider => {
            warn!(%provider, "web search grounding needs gemini; research agent answers from model knowledge");
            root_model.clone()
        }
    };

    with_models(root_model, search_model, settings.max_iterations)
}

/// The research sub-agent descriptor, exposed to the root agent as a tool.
pub fn search_agent(model: Arc<dyn ChatModel>) -> AgentBuilder {
    Agent::builder()
        .name(SEARCH_AGENT_NAME)
        .description("Search the web for real-time travel information")
        .instruction(SEARCH_INSTRUCTION)
        .shared_model(model)
}

pub fn with_models(
    root_model: Arc<dyn ChatModel>,
    search_model: Arc<dyn ChatModel>,
    max_iterations: u32,
) -> Result<App, AgentError> {
    let agent = Agent::builder()
        .name(APP_NAME)
        .instruction(INSTRUCTION)
        .shared_model(root_model)
        .tool(flight_status_tool())
        .tool(hotel_search_tool())
        .tool(agent_tool(search_agent(search_model).max_iterations(max_iterations))?)
        .max_iterations(max_iterations)
        .build()?;

    Ok(App {
        name: APP_NAME,
        banner: "Travel Assistant Ready!",
        sample_prompts: SAMPLE_PROMPTS,
        agent,
    })
}
