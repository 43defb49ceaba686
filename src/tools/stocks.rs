use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::{ToolSpec, parse_args, to_json};

pub const TOOL_NAME: &str = "get_stock_price";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StockQuote {
    pub ticker: &'static str,
    pub company: &'static str,
    pub price: &'static str,
}

static QUOTES: [StockQuote; 4] = [
    StockQuote {
        ticker: "AAPL",
        company: "Apple Inc.",
        price: "$185.50",
    },
    StockQuote {
        ticker: "GOOGL",
        company: "Alphabet Inc.",
        price: "$142.25",
    },
    StockQuote {
        ticker: "MSFT",
        company: "Microsoft Corp.",
        price: "$378.90",
    },
    StockQuote {
        ticker: "AMZN",
        company: "Amazon.com Inc.",
        price: "$178.35",
    },
];

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StockLookup {
    Quote(StockQuote),
    Unsupported { status: String, message: String },
}

pub fn get_stock_price(ticker: &str) -> StockLookup {
    let key = ticker.trim().to_uppercase();
    match QUOTES.iter().find(|quote| quote.ticker == key) {
        Some(quote) => StockLookup::Quote(*quote),
        None => StockLookup::Unsupported {
            status: "unsupported".to_string(),
            message: format!(
                "Stock price not available for '{ticker}'. Supported tickers: {}",
                QUOTES
                    .iter()
                    .map(|quote| quote.ticker)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
    }
}

#[derive(Debug, Deserialize)]
struct StockArgs {
    ticker: String,
}

pub fn stock_price_tool() -> ToolSpec {
    ToolSpec::new(TOOL_NAME, "Get the current stock price for a ticker symbol.")
        .with_schema(json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "The stock ticker symbol (e.g., AAPL, GOOGL)"
                }
            },
            "required": ["ticker"],
            "additionalProperties": false
        }))
        .expect("valid schema")
        .with_handler(|args, _deps| async move {
            let args: StockArgs = parse_args(TOOL_NAME, args)?;
            to_json(&get_stock_price(&args.ticker))
        })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::tools::Dependencies;

    #[test]
    fn tickers_resolve_case_insensitively() {
        assert_eq!(
            get_stock_price(" msft"),
            StockLookup::Quote(StockQuote {
                ticker: "MSFT",
                company: "Microsoft Corp.",
                price: "$378.90",
            })
        );
    }

    #[test]
    fn unknown_ticker_keeps_caller_spelling_in_message() {
        let StockLookup::Unsupported { message, .. } = get_stock_price("tsla") else {
            panic!("tsla is not listed");
        };
        assert_eq!(
            message,
            "Stock price not available for 'tsla'. Supported tickers: AAPL, GOOGL, MSFT, AMZN"
        );
    }

    #[tokio::test]
    async fn tool_returns_quote_json() {
        let outcome = stock_price_tool()
            .call(json!({"ticker": "googl"}), &Dependencies::new())
            .await
            .expect("tool runs");
        let value: Value = serde_json::from_str(&outcome.into_text()).expect("json text");

        assert_eq!(value, json!({"ticker": "GOOGL", "company": "Alphabet Inc.", "price": "$142.25"}));
    }
}
