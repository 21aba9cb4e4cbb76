//! Alpaca REST adapter: daily bars from the market-data API, account,
//! positions and market orders from the trading API.
//!
//! All calls are blocking. Credentials and endpoints come from an explicit
//! [`AlpacaConfig`]; nothing is read from the environment here.

use crate::domain::error::DualmomError;
use crate::domain::order::{OrderAck, OrderRequest, SizeSpec};
use crate::domain::position::Position;
use crate::domain::price::DailyClose;
use crate::ports::broker_port::BrokerPort;
use crate::ports::price_port::PricePort;
use chrono::{DateTime, NaiveDate};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const PAPER_TRADING_URL: &str = "https://paper-api.alpaca.markets";
pub const DATA_URL: &str = "https://data.alpaca.markets";
const BARS_PAGE_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub key_id: String,
    pub secret_key: String,
    pub trading_url: String,
    pub data_url: String,
    /// Market-data feed, `iex` on free plans.
    pub feed: String,
    /// Pause after each bar page request.
    pub request_delay: Duration,
}

pub struct AlpacaClient {
    client: Client,
    config: AlpacaConfig,
}

impl AlpacaClient {
    pub fn new(config: AlpacaConfig) -> Result<Self, DualmomError> {
        if config.key_id.is_empty() || config.secret_key.is_empty() {
            return Err(DualmomError::ConfigMissing {
                section: "alpaca".to_string(),
                key: "key_id/secret_key".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DualmomError::Broker {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("APCA-API-KEY-ID", &self.config.key_id)
            .header("APCA-API-SECRET-KEY", &self.config.secret_key)
    }

    fn send(&self, request: RequestBuilder, what: &str) -> Result<String, String> {
        let response = self
            .authed(request)
            .send()
            .map_err(|e| format!("{what} request failed: {e}"))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| format!("{what} response unreadable: {e}"))?;
        if !status.is_success() {
            return Err(format!("{what} returned {status}: {body}"));
        }
        Ok(body)
    }

    fn trading(&self, request: RequestBuilder, what: &str) -> Result<String, DualmomError> {
        self.send(request, what)
            .map_err(|reason| DualmomError::Broker { reason })
    }

    fn trading_url(&self, path: &str) -> String {
        format!("{}{}", self.config.trading_url.trim_end_matches('/'), path)
    }
}

impl PricePort for AlpacaClient {
    fn get_daily_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyClose>, DualmomError> {
        let url = format!(
            "{}/v2/stocks/{}/bars",
            self.config.data_url.trim_end_matches('/'),
            symbol
        );
        let start = start_date.to_string();
        let end = end_date.to_string();
        let limit = BARS_PAGE_LIMIT.to_string();

        let mut closes = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("timeframe", "1Day"),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", limit.as_str()),
                ("adjustment", "raw"),
                ("feed", self.config.feed.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }
            let response = self.send(self.client.get(&url).query(&query), "bars");
            // Fixed delay after every page, successful or not.
            std::thread::sleep(self.config.request_delay);
            let body = response.map_err(|reason| DualmomError::PriceSource { reason })?;
            let page = parse_bars(&body)?;
            closes.extend(page.closes);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if closes.is_empty() {
            return Err(DualmomError::DataUnavailable {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        closes.sort_by_key(|c| c.date);
        debug!(symbol, bars = closes.len(), "downloaded daily bars");
        Ok(closes)
    }
}

impl BrokerPort for AlpacaClient {
    fn get_positions(&self) -> Result<Vec<Position>, DualmomError> {
        let body = self.trading(self.client.get(self.trading_url("/v2/positions")), "positions")?;
        parse_positions(&body)
    }

    fn get_account_equity(&self) -> Result<f64, DualmomError> {
        let body = self.trading(self.client.get(self.trading_url("/v2/account")), "account")?;
        parse_equity(&body)
    }

    fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, DualmomError> {
        let request = self
            .client
            .post(self.trading_url("/v2/orders"))
            .json(&OrderBody::from(order));
        let body = self.trading(request, "order")?;
        parse_order_ack(&body)
    }
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<Bar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    t: String,
    c: f64,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    equity: String,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    qty: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct OrderBody<'a> {
    symbol: &'a str,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notional: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qty: Option<String>,
}

impl<'a> From<&'a OrderRequest> for OrderBody<'a> {
    fn from(order: &'a OrderRequest) -> Self {
        let (notional, qty) = match order.size {
            SizeSpec::Notional(n) => (Some(format!("{:.2}", n)), None),
            SizeSpec::Quantity(q) => (None, Some(q.to_string())),
        };
        OrderBody {
            symbol: &order.symbol,
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: order.time_in_force.as_str(),
            notional,
            qty,
        }
    }
}

#[derive(Debug)]
struct BarsPage {
    closes: Vec<DailyClose>,
    next_page_token: Option<String>,
}

fn decode_error(what: &str, e: serde_json::Error) -> String {
    format!("malformed {what} response: {e}")
}

/// Bar timestamps are RFC 3339 instants; only the calendar date is kept.
fn parse_bars(body: &str) -> Result<BarsPage, DualmomError> {
    let response: BarsResponse = serde_json::from_str(body).map_err(|e| {
        DualmomError::PriceSource {
            reason: decode_error("bars", e),
        }
    })?;
    let closes = response
        .bars
        .unwrap_or_default()
        .into_iter()
        .map(|bar| {
            DateTime::parse_from_rfc3339(&bar.t)
                .map(|t| DailyClose::new(t.date_naive(), bar.c))
                .map_err(|e| DualmomError::PriceSource {
                    reason: format!("invalid bar timestamp '{}': {}", bar.t, e),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BarsPage {
        closes,
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
    })
}

fn parse_decimal(value: &str, field: &str) -> Result<f64, DualmomError> {
    value.trim().parse::<f64>().map_err(|e| DualmomError::Broker {
        reason: format!("invalid {field} '{value}': {e}"),
    })
}

fn parse_equity(body: &str) -> Result<f64, DualmomError> {
    let account: AccountResponse =
        serde_json::from_str(body).map_err(|e| DualmomError::Broker {
            reason: decode_error("account", e),
        })?;
    parse_decimal(&account.equity, "equity")
}

fn parse_positions(body: &str) -> Result<Vec<Position>, DualmomError> {
    let positions: Vec<PositionResponse> =
        serde_json::from_str(body).map_err(|e| DualmomError::Broker {
            reason: decode_error("positions", e),
        })?;
    positions
        .into_iter()
        .map(|p| -> Result<Position, DualmomError> {
            let quantity = parse_decimal(&p.qty, "qty")?;
            Ok(Position::new(p.symbol, quantity))
        })
        .collect()
}

fn parse_order_ack(body: &str) -> Result<OrderAck, DualmomError> {
    let order: OrderResponse = serde_json::from_str(body).map_err(|e| DualmomError::Broker {
        reason: decode_error("order", e),
    })?;
    Ok(OrderAck {
        id: order.id,
        status: order.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::TimeInForce;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config() -> AlpacaConfig {
        AlpacaConfig {
            key_id: "key".into(),
            secret_key: "secret".into(),
            trading_url: PAPER_TRADING_URL.into(),
            data_url: DATA_URL.into(),
            feed: "iex".into(),
            request_delay: Duration::from_millis(250),
        }
    }

    #[test]
    fn parse_bars_keeps_calendar_date() {
        let body = r#"{
            "bars": [
                {"t": "2024-01-02T05:00:00Z", "o": 472.1, "h": 473.6, "l": 470.4, "c": 472.65, "v": 123},
                {"t": "2024-01-03T05:00:00Z", "o": 470.4, "h": 471.1, "l": 468.1, "c": 468.79, "v": 456}
            ],
            "symbol": "SPY",
            "next_page_token": "abc"
        }"#;
        let page = parse_bars(body).unwrap();
        assert_eq!(
            page.closes,
            vec![
                DailyClose::new(d("2024-01-02"), 472.65),
                DailyClose::new(d("2024-01-03"), 468.79),
            ]
        );
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn parse_bars_null_bars_is_empty() {
        let page = parse_bars(r#"{"bars": null, "symbol": "SPY", "next_page_token": null}"#).unwrap();
        assert!(page.closes.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn parse_bars_bad_timestamp() {
        let err = parse_bars(r#"{"bars": [{"t": "yesterday", "c": 1.0}]}"#).unwrap_err();
        assert!(matches!(err, DualmomError::PriceSource { .. }));
    }

    #[test]
    fn parse_equity_from_string_field() {
        let body = r#"{"id": "acct", "equity": "100523.17", "cash": "90000"}"#;
        assert!((parse_equity(body).unwrap() - 100_523.17).abs() < 1e-9);
    }

    #[test]
    fn parse_equity_malformed() {
        assert!(matches!(
            parse_equity(r#"{"equity": "n/a"}"#).unwrap_err(),
            DualmomError::Broker { .. }
        ));
        assert!(parse_equity("not json").is_err());
    }

    #[test]
    fn parse_positions_list() {
        let body = r#"[
            {"symbol": "SPY", "qty": "5", "side": "long"},
            {"symbol": "TSLA", "qty": "1.25", "side": "long"}
        ]"#;
        assert_eq!(
            parse_positions(body).unwrap(),
            vec![Position::new("SPY", 5.0), Position::new("TSLA", 1.25)]
        );
        assert!(parse_positions("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_order_ack_fields() {
        let ack = parse_order_ack(r#"{"id": "904837e3", "status": "accepted", "symbol": "QQQ"}"#)
            .unwrap();
        assert_eq!(
            ack,
            OrderAck {
                id: "904837e3".into(),
                status: "accepted".into()
            }
        );
    }

    #[test]
    fn order_body_notional() {
        let order = OrderRequest::buy_notional("QQQ", 1000.0, TimeInForce::Day);
        let json = serde_json::to_value(OrderBody::from(&order)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "symbol": "QQQ",
                "side": "buy",
                "type": "market",
                "time_in_force": "day",
                "notional": "1000.00"
            })
        );
    }

    #[test]
    fn order_body_quantity() {
        let order = OrderRequest::sell_quantity("SPY", 2.5, TimeInForce::Day);
        let json = serde_json::to_value(OrderBody::from(&order)).unwrap();
        assert_eq!(json["qty"], "2.5");
        assert_eq!(json["side"], "sell");
        assert!(json.get("notional").is_none());
    }

    #[test]
    fn client_requires_credentials() {
        let err = AlpacaClient::new(AlpacaConfig {
            key_id: String::new(),
            ..config()
        })
        .err()
        .unwrap();
        assert!(matches!(err, DualmomError::ConfigMissing { .. }));
    }

    #[test]
    fn trading_url_joins_path() {
        let client = AlpacaClient::new(AlpacaConfig {
            trading_url: "https://paper-api.alpaca.markets/".into(),
            ..config()
        })
        .unwrap();
        assert_eq!(
            client.trading_url("/v2/account"),
            "https://paper-api.alpaca.markets/v2/account"
        );
    }

    #[test]
    fn failed_bar_page_still_waits_out_the_delay() {
        let client = AlpacaClient::new(AlpacaConfig {
            data_url: "http://127.0.0.1:1".into(),
            request_delay: Duration::from_millis(150),
            ..config()
        })
        .unwrap();
        let started = std::time::Instant::now();
        let err = client
            .get_daily_closes("SPY", d("2024-01-02"), d("2024-01-31"))
            .unwrap_err();
        assert!(matches!(err, DualmomError::PriceSource { .. }));
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    #[ignore] // Requires network access and credentials
    fn fetch_spy_bars() {
        let client = AlpacaClient::new(config()).unwrap();
        let closes = client
            .get_daily_closes("SPY", d("2024-01-01"), d("2024-01-31"))
            .unwrap();
        assert!(!closes.is_empty());
    }
}
