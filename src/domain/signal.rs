//! Monthly relative-momentum signal between two assets.
//!
//! Momentum is sampled on month-end dates. The raw decision at month-end `m`
//! uses only prices observed up to `m`; the lagged series shifts every
//! decision forward one sample so that the choice made at `m` governs the
//! period ending at `m+1`. Backtest and execution consume the lagged series.

use crate::domain::calendar::month_end_dates;
use crate::domain::error::DualmomError;
use crate::domain::momentum::momentum;
use crate::domain::price::AlignedPrices;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    A,
    B,
}

/// The two tradable symbols. Order matters: ties resolve to `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPair {
    pub a: String,
    pub b: String,
}

impl AssetPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn symbol(&self, leg: Leg) -> &str {
        match leg {
            Leg::A => &self.a,
            Leg::B => &self.b,
        }
    }

    pub fn leg_of(&self, symbol: &str) -> Option<Leg> {
        if symbol == self.a {
            Some(Leg::A)
        } else if symbol == self.b {
            Some(Leg::B)
        } else {
            None
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.leg_of(symbol).is_some()
    }

    pub fn symbols(&self) -> [&str; 2] {
        [self.a.as_str(), self.b.as_str()]
    }
}

/// Tie policy: A only when its momentum is strictly greater, otherwise B.
/// Undefined momentum on either side yields no decision.
pub fn choose(momentum_a: Option<f64>, momentum_b: Option<f64>) -> Option<Leg> {
    match (momentum_a, momentum_b) {
        (Some(a), Some(b)) if a > b => Some(Leg::A),
        (Some(_), Some(_)) => Some(Leg::B),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalPoint {
    pub date: NaiveDate,
    pub choice: Option<Leg>,
    pub momentum_a: Option<f64>,
    pub momentum_b: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub pair: AssetPair,
    /// Decision observed at each month-end, not yet actionable.
    pub raw: Vec<SignalPoint>,
    /// Decision applicable to each month-end: the previous sample's raw choice.
    pub lagged: Vec<SignalPoint>,
}

impl Signal {
    pub fn compute(
        prices: &AlignedPrices,
        pair: &AssetPair,
        lookback: usize,
    ) -> Result<Self, DualmomError> {
        let mom_a = momentum(column(prices, &pair.a)?, lookback);
        let mom_b = momentum(column(prices, &pair.b)?, lookback);

        let mut ends = month_end_dates(&prices.dates).into_iter().peekable();
        let mut raw = Vec::new();
        for (row, &date) in prices.dates.iter().enumerate() {
            if ends.peek() != Some(&date) {
                continue;
            }
            ends.next();
            raw.push(SignalPoint {
                date,
                choice: choose(mom_a[row], mom_b[row]),
                momentum_a: mom_a[row],
                momentum_b: mom_b[row],
            });
        }

        let lagged = lag(&raw);

        if let (Some(first), Some(last)) = (
            raw.iter().find(|p| p.choice.is_some()),
            raw.iter().rev().find(|p| p.choice.is_some()),
        ) {
            debug!(first = %first.date, last = %last.date, "raw decisions available");
        }

        Ok(Self {
            pair: pair.clone(),
            raw,
            lagged,
        })
    }

    /// Latest lagged point dated on or before `date`.
    pub fn lagged_as_of(&self, date: NaiveDate) -> Option<&SignalPoint> {
        self.lagged.iter().rev().find(|p| p.date <= date)
    }

    pub fn first_actionable(&self) -> Option<&SignalPoint> {
        self.lagged.iter().find(|p| p.choice.is_some())
    }

    pub fn last_actionable(&self) -> Option<&SignalPoint> {
        self.lagged.iter().rev().find(|p| p.choice.is_some())
    }

    pub fn symbol_of(&self, point: &SignalPoint) -> Option<&str> {
        point.choice.map(|leg| self.pair.symbol(leg))
    }
}

fn column<'a>(prices: &'a AlignedPrices, symbol: &str) -> Result<&'a [Option<f64>], DualmomError> {
    prices
        .column(symbol)
        .ok_or_else(|| DualmomError::DataUnavailable {
            symbol: symbol.to_string(),
            start: prices.dates.first().map(|d| d.to_string()).unwrap_or_default(),
            end: prices.dates.last().map(|d| d.to_string()).unwrap_or_default(),
        })
}

/// Shift decisions forward by one sample. Each lagged point keeps its own
/// date but carries the choice and momentum of the sample it came from.
fn lag(raw: &[SignalPoint]) -> Vec<SignalPoint> {
    raw.iter()
        .enumerate()
        .map(|(i, point)| match i.checked_sub(1).map(|prev| &raw[prev]) {
            Some(source) => SignalPoint {
                date: point.date,
                ..*source
            },
            None => SignalPoint {
                date: point.date,
                choice: None,
                momentum_a: None,
                momentum_b: None,
            },
        })
        .collect()
}
