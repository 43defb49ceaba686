use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::{Dependencies, ToolSpec, parse_args, to_json};

pub const TOOL_NAME: &str = "search_hotels";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_GUESTS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hotel {
    pub id: &'static str,
    pub name: &'static str,
    pub stars: u8,
    pub price_per_night: u32,
    pub available: bool,
    pub amenities: &'static [&'static str],
}

/// Hotels listed for one city, keyed by the lower-case city name.
pub type CityListing = (&'static str, &'static [Hotel]);

static BUILTIN_HOTELS: [CityListing; 3] = [
    (
        "paris",
        &[
            Hotel {
                id: "H001",
                name: "Hotel Le Marais",
                stars: 4,
                price_per_night: 180,
                available: true,
                amenities: &["WiFi", "Breakfast", "Pool"],
            },
            Hotel {
                id: "H002",
                name: "Boutique Saint-Germain",
                stars: 5,
                price_per_night: 320,
                available: true,
                amenities: &["WiFi", "Spa", "Restaurant", "Gym"],
            },
            Hotel {
                id: "H003",
                name: "Paris Budget Inn",
                stars: 2,
                price_per_night: 75,
                available: true,
                amenities: &["WiFi"],
            },
        ],
    ),
    (
        "tokyo",
        &[
            Hotel {
                id: "H004",
                name: "Shinjuku Grand Hotel",
                stars: 4,
                price_per_night: 150,
                available: true,
                amenities: &["WiFi", "Restaurant", "Onsen"],
            },
            Hotel {
                id: "H005",
                name: "Shibuya Capsule Hotel",
                stars: 2,
                price_per_night: 45,
                available: true,
                amenities: &["WiFi", "Locker"],
            },
            Hotel {
                id: "H006",
                name: "Imperial Tokyo",
                stars: 5,
                price_per_night: 450,
                available: false,
                amenities: &["WiFi", "Spa", "Pool", "Restaurant", "Gym"],
            },
        ],
    ),
    (
        "london",
        &[
            Hotel {
                id: "H007",
                name: "The Westminster",
                stars: 4,
                price_per_night: 200,
                available: true,
                amenities: &["WiFi", "Breakfast", "Bar"],
            },
            Hotel {
                id: "H008",
                name: "Covent Garden Suites",
                stars: 5,
                price_per_night: 380,
                available: true,
                amenities: &["WiFi", "Spa", "Restaurant", "Theater tickets"],
            },
        ],
    ),
];

#[derive(Clone, Copy, Debug)]
pub struct HotelCatalog {
    cities: &'static [CityListing],
}

impl HotelCatalog {
    pub const fn new(cities: &'static [CityListing]) -> Self {
        Self { cities }
    }

    pub const fn builtin() -> Self {
        Self::new(&BUILTIN_HOTELS)
    }

    pub fn search(&self, query: &HotelQuery) -> HotelSearchReport {
        let city_key = query.city.trim().to_lowercase();

        let Some((_, hotels)) = self.cities.iter().find(|(city, _)| *city == city_key) else {
            return HotelSearchReport::UnknownCity {
                found: 0,
                error: format!(
                    "No hotels in '{}'. Available: {}",
                    query.city,
                    self.city_names().join(", ")
                ),
            };
        };

        let available = hotels.iter().filter(|hotel| hotel.available);
        let nights = stay_nights(&query.check_in, &query.check_out);

        let offers = available
            .map(|hotel| HotelOffer {
                id: hotel.id.to_string(),
                name: hotel.name.to_string(),
                stars: "⭐".repeat(usize::from(hotel.stars)),
                price_per_night: format!("${}", hotel.price_per_night),
                total: format!("${}", u64::from(hotel.price_per_night) * u64::from(nights)),
                amenities: hotel.amenities.iter().map(|a| a.to_string()).collect(),
            })
            .collect::<Vec<_>>();

        if offers.is_empty() {
            return HotelSearchReport::NoAvailability {
                found: 0,
                message: format!("No availability in {} for those dates.", query.city),
            };
        }

        HotelSearchReport::Results {
            found: offers.len(),
            city: query.city.clone(),
            nights,
            hotels: offers,
        }
    }

    fn city_names(&self) -> Vec<String> {
        self.cities
            .iter()
            .map(|(city, _)| title_case(city))
            .collect()
    }
}

/// Number of nights between two `YYYY-MM-DD` dates, never less than one.
/// Unparseable dates, including ones padded with whitespace, count as a
/// single night.
pub fn stay_nights(check_in: &str, check_out: &str) -> u32 {
    let parse = |value: &str| {
        (value.trim() == value)
            .then(|| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
            .flatten()
    };
    match (parse(check_in), parse(check_out)) {
        (Some(start), Some(end)) => {
            let days = end.signed_duration_since(start).num_days();
            u32::try_from(days.max(1)).unwrap_or(u32::MAX)
        }
        _ => 1,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct HotelQuery {
    pub city: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(default = "default_guests")]
    pub guests: u32,
}

fn default_guests() -> u32 {
    DEFAULT_GUESTS
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HotelSearchReport {
    Results {
        found: usize,
        city: String,
        nights: u32,
        hotels: Vec<HotelOffer>,
    },
    UnknownCity {
        found: usize,
        error: String,
    },
    NoAvailability {
        found: usize,
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HotelOffer {
    pub id: String,
    pub name: String,
    pub stars: String,
    pub price_per_night: String,
    pub total: String,
    pub amenities: Vec<String>,
}

pub fn search_hotels(city: &str, check_in: &str, check_out: &str, guests: u32) -> HotelSearchReport {
    HotelCatalog::builtin().search(&HotelQuery {
        city: city.to_string(),
        check_in: check_in.to_string(),
        check_out: check_out.to_string(),
        guests,
    })
}

pub fn hotel_search_tool() -> ToolSpec {
    ToolSpec::new(
        TOOL_NAME,
        "Search for available hotels in a city. Use this when a user wants to find hotels, \
         accommodation, or places to stay.",
    )
    .with_schema(json!({
        "type": "object",
        "properties": {
            "city": {
                "type": "string",
                "description": "Destination city (e.g., \"Paris\", \"Tokyo\", \"London\")"
            },
            "check_in": {
                "type": "string",
                "description": "Check-in date in YYYY-MM-DD format"
            },
            "check_out": {
                "type": "string",
                "description": "Check-out date in YYYY-MM-DD format"
            },
            "guests": {
                "type": "integer",
                "description": "Number of guests (default: 2)"
            }
        },
        "required": ["city", "check_in", "check_out"],
        "additionalProperties": false
    }))
    .expect("valid schema")
    .with_handler(|args, deps: &Dependencies| {
        let catalog = deps
            .get::<HotelCatalog>()
            .copied()
            .unwrap_or_else(HotelCatalog::builtin);
        async move {
            let query: HotelQuery = parse_args(TOOL_NAME, args)?;
            tracing::debug!(
                city = %query.city,
                check_in = %query.check_in,
                check_out = %query.check_out,
                guests = query.guests,
                "hotel search"
            );
            to_json(&catalog.search(&query))
        }
    })
}
