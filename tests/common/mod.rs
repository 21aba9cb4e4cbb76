#![allow(dead_code)]

use chrono::{Datelike, Days, NaiveDate, Weekday};
use dualmom::domain::error::DualmomError;
use dualmom::domain::order::{OrderAck, OrderRequest, OrderSide, SizeSpec};
use dualmom::domain::position::Position;
pub use dualmom::domain::price::DailyClose;
use dualmom::ports::broker_port::BrokerPort;
use dualmom::ports::price_port::PricePort;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub struct MockPricePort {
    pub data: HashMap<String, Vec<DailyClose>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: Vec<DailyClose>) -> Self {
        self.data.insert(symbol.to_string(), closes);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn get_daily_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyClose>, DualmomError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DualmomError::PriceSource {
                reason: reason.clone(),
            });
        }
        let closes: Vec<DailyClose> = self
            .data
            .get(symbol)
            .map(|c| {
                c.iter()
                    .filter(|c| c.date >= start_date && c.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if closes.is_empty() {
            return Err(DualmomError::DataUnavailable {
                symbol: symbol.to_string(),
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }
        Ok(closes)
    }
}

/// In-memory brokerage account. With `fill` set, orders change the
/// positions the way an immediate fill would: a sell closes the symbol and
/// a buy opens it at a fixed price of 100.
pub struct MockBroker {
    pub equity: f64,
    pub positions: RefCell<Vec<Position>>,
    pub submitted: RefCell<Vec<OrderRequest>>,
    pub fill: bool,
    pub fail_submit: bool,
    next_id: Cell<u32>,
}

impl MockBroker {
    pub fn new(equity: f64) -> Self {
        Self {
            equity,
            positions: RefCell::new(Vec::new()),
            submitted: RefCell::new(Vec::new()),
            fill: false,
            fail_submit: false,
            next_id: Cell::new(1),
        }
    }

    pub fn holding(self, symbol: &str, quantity: f64) -> Self {
        self.positions
            .borrow_mut()
            .push(Position::new(symbol, quantity));
        self
    }

    pub fn filling(mut self) -> Self {
        self.fill = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.borrow().clone()
    }
}

impl BrokerPort for MockBroker {
    fn get_positions(&self) -> Result<Vec<Position>, DualmomError> {
        Ok(self.positions.borrow().clone())
    }

    fn get_account_equity(&self) -> Result<f64, DualmomError> {
        Ok(self.equity)
    }

    fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, DualmomError> {
        if self.fail_submit {
            return Err(DualmomError::Broker {
                reason: "order rejected".into(),
            });
        }
        self.submitted.borrow_mut().push(order.clone());
        if self.fill {
            let mut positions = self.positions.borrow_mut();
            match (order.side, order.size) {
                (OrderSide::Sell, _) => positions.retain(|p| p.symbol != order.symbol),
                (OrderSide::Buy, SizeSpec::Notional(n)) => {
                    positions.push(Position::new(order.symbol.as_str(), n / 100.0))
                }
                (OrderSide::Buy, SizeSpec::Quantity(q)) => {
                    positions.push(Position::new(order.symbol.as_str(), q))
                }
            }
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(OrderAck {
            id: format!("order-{id}"),
            status: "accepted".into(),
        })
    }
}

/// Every Monday-to-Friday date in `[start, end]`.
pub fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut d = start;
    while d <= end {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d = d.checked_add_days(Days::new(1)).unwrap();
    }
    dates
}

/// Closes where the i-th date gets `price(i)`.
pub fn closes_from(dates: &[NaiveDate], price: impl Fn(usize) -> f64) -> Vec<DailyClose> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &d)| DailyClose::new(d, price(i)))
        .collect()
}

/// Geometric daily path starting at `base`.
pub fn trending(dates: &[NaiveDate], base: f64, daily_growth: f64) -> Vec<DailyClose> {
    closes_from(dates, |i| base * (1.0 + daily_growth).powi(i as i32))
}

/// A mock price store where `a` compounds at `growth_a` per weekday and `b`
/// at `growth_b`.
pub fn two_asset_port(
    a: &str,
    b: &str,
    start: &str,
    end: &str,
    growth_a: f64,
    growth_b: f64,
) -> MockPricePort {
    let dates = weekdays(date(start), date(end));
    MockPricePort::new()
        .with_closes(a, trending(&dates, 100.0, growth_a))
        .with_closes(b, trending(&dates, 100.0, growth_b))
}
