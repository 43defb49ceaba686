use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::{ToolSpec, parse_args, to_json};

pub const TOOL_NAME: &str = "get_weather";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WeatherReport {
    pub city: &'static str,
    pub temperature: &'static str,
    pub condition: &'static str,
}

static WEATHER: [(&str, WeatherReport); 4] = [
    (
        "new york",
        WeatherReport {
            city: "New York",
            temperature: "45°F",
            condition: "Cloudy",
        },
    ),
    (
        "los angeles",
        WeatherReport {
            city: "Los Angeles",
            temperature: "72°F",
            condition: "Sunny",
        },
    ),
    (
        "chicago",
        WeatherReport {
            city: "Chicago",
            temperature: "28°F",
            condition: "Snowy",
        },
    ),
    (
        "miami",
        WeatherReport {
            city: "Miami",
            temperature: "82°F",
            condition: "Partly Cloudy",
        },
    ),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WeatherLookup {
    Report(WeatherReport),
    Unsupported { status: String, message: String },
}

pub fn get_weather(city: &str) -> WeatherLookup {
    let key = city.trim().to_lowercase();
    if let Some((_, report)) = WEATHER.iter().find(|(name, _)| *name == key) {
        return WeatherLookup::Report(*report);
    }

    let supported = WEATHER
        .iter()
        .map(|(_, report)| report.city)
        .collect::<Vec<_>>()
        .join(", ");
    WeatherLookup::Unsupported {
        status: "unsupported".to_string(),
        message: format!("Weather data not available for '{city}'. Supported cities: {supported}"),
    }
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    city: String,
}

pub fn weather_tool() -> ToolSpec {
    ToolSpec::new(TOOL_NAME, "Get the current weather for a city.")
        .with_schema(json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "The name of the city"}
            },
            "required": ["city"],
            "additionalProperties": false
        }))
        .expect("valid schema")
        .with_handler(|args, _deps| async move {
            let args: WeatherArgs = parse_args(TOOL_NAME, args)?;
            to_json(&get_weather(&args.city))
        })
}
