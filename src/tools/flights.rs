use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::{Dependencies, ToolSpec, parse_args, to_json};

pub const TOOL_NAME: &str = "get_flight_status";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FlightStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Delayed,
    Boarding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flight {
    pub number: &'static str,
    pub airline: &'static str,
    pub origin: &'static str,
    pub destination: &'static str,
    pub departure: &'static str,
    pub arrival: &'static str,
    pub status: FlightStatus,
    pub delay_minutes: Option<u32>,
    pub gate: &'static str,
}

static BUILTIN_FLIGHTS: [Flight; 3] = [
    Flight {
        number: "AA123",
        airline: "American Airlines",
        origin: "JFK",
        destination: "LAX",
        departure: "2026-03-15 08:00",
        arrival: "2026-03-15 11:30",
        status: FlightStatus::OnTime,
        delay_minutes: None,
        gate: "B22",
    },
    Flight {
        number: "UA456",
        airline: "United Airlines",
        origin: "SFO",
        destination: "ORD",
        departure: "2026-03-15 14:00",
        arrival: "2026-03-15 20:15",
        status: FlightStatus::Delayed,
        delay_minutes: Some(45),
        gate: "C17",
    },
    Flight {
        number: "DL789",
        airline: "Delta Airlines",
        origin: "ATL",
        destination: "MIA",
        departure: "2026-03-15 10:30",
        arrival: "2026-03-15 12:45",
        status: FlightStatus::Boarding,
        delay_minutes: None,
        gate: "A5",
    },
];

/// Read-only flight table consulted by [`flight_status_tool`].
#[derive(Clone, Copy, Debug)]
pub struct FlightBoard {
    flights: &'static [Flight],
}

impl FlightBoard {
    pub const fn new(flights: &'static [Flight]) -> Self {
        Self { flights }
    }

    pub const fn builtin() -> Self {
        Self::new(&BUILTIN_FLIGHTS)
    }

    pub fn status(&self, flight_number: &str) -> FlightStatusReport {
        let key = flight_number.trim().to_uppercase();

        match self.flights.iter().find(|flight| flight.number == key) {
            Some(flight) => FlightStatusReport::Found(FlightDetails {
                found: true,
                flight_number: key,
                airline: flight.airline.to_string(),
                route: format!("{} → {}", flight.origin, flight.destination),
                departure: flight.departure.to_string(),
                arrival: flight.arrival.to_string(),
                status: flight.status,
                gate: flight.gate.to_string(),
                delay: flight
                    .delay_minutes
                    .map(|minutes| format!("{minutes} minutes")),
            }),
            None => FlightStatusReport::NotFound(FlightNotFound {
                found: false,
                error: format!("Flight '{key}' not found."),
                hint: self.hint(),
            }),
        }
    }

    fn hint(&self) -> String {
        let numbers = self
            .flights
            .iter()
            .map(|flight| flight.number)
            .collect::<Vec<_>>();
        match numbers.split_last() {
            None => "No flights are currently listed".to_string(),
            Some((only, [])) => format!("Try: {only}"),
            Some((last, rest)) => format!("Try: {}, or {last}", rest.join(", ")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlightStatusReport {
    Found(FlightDetails),
    NotFound(FlightNotFound),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlightDetails {
    pub found: bool,
    pub flight_number: String,
    pub airline: String,
    pub route: String,
    pub departure: String,
    pub arrival: String,
    pub status: FlightStatus,
    pub gate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlightNotFound {
    pub found: bool,
    pub error: String,
    pub hint: String,
}

#[derive(Debug, Deserialize)]
struct FlightStatusArgs {
    flight_number: String,
}

/// Looks up a flight on the built-in board.
pub fn get_flight_status(flight_number: &str) -> FlightStatusReport {
    FlightBoard::builtin().status(flight_number)
}

pub fn flight_status_tool() -> ToolSpec {
    ToolSpec::new(
        TOOL_NAME,
        "Get the current status of a flight. Use this when a user asks about their flight \
         status, departure time, arrival time, gate information, or delays.",
    )
    .with_schema(json!({
        "type": "object",
        "properties": {
            "flight_number": {
                "type": "string",
                "description": "The flight number (e.g., \"AA123\", \"UA456\")"
            }
        },
        "required": ["flight_number"],
        "additionalProperties": false
    }))
    .expect("valid schema")
    .with_handler(|args, deps: &Dependencies| {
        let board = deps
            .get::<FlightBoard>()
            .copied()
            .unwrap_or_else(FlightBoard::builtin);
        async move {
            let args: FlightStatusArgs = parse_args(TOOL_NAME, args)?;
            let report = board.status(&args.flight_number);
            tracing::debug!(
                flight = %args.flight_number,
                found = matches!(report, FlightStatusReport::Found(_)),
                "flight lookup"
            );
            to_json(&report)
        }
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn known_flights_return_their_canned_details() {
        let FlightStatusReport::Found(details) = get_flight_status("AA123") else {
            panic!("AA123 should be listed");
        };
        assert_eq!(details.airline, "American Airlines");
        assert_eq!(details.route, "JFK → LAX");
        assert_eq!(details.departure, "2026-03-15 08:00");
        assert_eq!(details.arrival, "2026-03-15 11:30");
        assert_eq!(details.status, FlightStatus::OnTime);
        assert_eq!(details.gate, "B22");
        assert_eq!(details.delay, None);

        let FlightStatusReport::Found(delayed) = get_flight_status("UA456") else {
            panic!("UA456 should be listed");
        };
        assert_eq!(delayed.status, FlightStatus::Delayed);
        assert_eq!(delayed.delay.as_deref(), Some("45 minutes"));
    }

    #[test]
    fn flight_number_is_trimmed_and_upper_cased() {
        let FlightStatusReport::Found(details) = get_flight_status("  dl789 ") else {
            panic!("dl789 should resolve to DL789");
        };
        assert_eq!(details.flight_number, "DL789");
        assert_eq!(details.status, FlightStatus::Boarding);
        assert_eq!(details.gate, "A5");
    }

    #[test]
    fn unknown_flight_returns_hint_instead_of_error() {
        let report = get_flight_status("zz999");
        assert_eq!(
            report,
            FlightStatusReport::NotFound(FlightNotFound {
                found: false,
                error: "Flight 'ZZ999' not found.".to_string(),
                hint: "Try: AA123, UA456, or DL789".to_string(),
            })
        );
    }

    #[test]
    fn repeated_lookups_are_identical() {
        assert_eq!(get_flight_status("UA456"), get_flight_status("UA456"));
        assert_eq!(get_flight_status("nope"), get_flight_status("nope"));
    }

    #[test]
    fn report_serializes_with_status_labels() {
        let value = serde_json::to_value(get_flight_status("AA123")).expect("serializes");
        assert_eq!(value["found"], true);
        assert_eq!(value["status"], "On Time");
        assert!(value.get("delay").is_none());

        let delayed = serde_json::to_value(get_flight_status("UA456")).expect("serializes");
        assert_eq!(delayed["delay"], "45 minutes");
    }

    #[tokio::test]
    async fn tool_reads_injected_board() {
        static SINGLE: [Flight; 1] = [Flight {
            number: "BA1",
            airline: "British Airways",
            origin: "LHR",
            destination: "JFK",
            departure: "2026-03-16 09:00",
            arrival: "2026-03-16 12:00",
            status: FlightStatus::OnTime,
            delay_minutes: None,
            gate: "5",
        }];
        let deps = Dependencies::new().with(FlightBoard::new(&SINGLE));

        let outcome = flight_status_tool()
            .call(json!({"flight_number": "AA123"}), &deps)
            .await
            .expect("tool runs");
        let value: Value = serde_json::from_str(&outcome.into_text()).expect("json text");
        assert_eq!(value["found"], false);
        assert_eq!(value["hint"], "Try: BA1");
    }
}
