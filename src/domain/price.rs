//! Daily close series and outer-join alignment across symbols.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

impl DailyClose {
    /// Closes must be positive, finite prices.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Closing prices for one symbol, ascending by date with unique dates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub closes: Vec<DailyClose>,
}

impl PriceSeries {
    /// Sorts by date; on duplicate dates the last supplied close wins.
    pub fn new(symbol: impl Into<String>, mut closes: Vec<DailyClose>) -> Self {
        closes.sort_by_key(|c| c.date);
        let mut deduped: Vec<DailyClose> = Vec::with_capacity(closes.len());
        for c in closes {
            match deduped.last_mut() {
                Some(last) if last.date == c.date => *last = c,
                _ => deduped.push(c),
            }
        }
        Self {
            symbol: symbol.into(),
            closes: deduped,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Several price series joined on the union of their dates. A symbol with no
/// bar on a given date holds `None` in that row.
#[derive(Debug, Clone)]
pub struct AlignedPrices {
    pub symbols: Vec<String>,
    pub dates: Vec<NaiveDate>,
    columns: Vec<Vec<Option<f64>>>,
}

impl AlignedPrices {
    pub fn align(series: &[PriceSeries]) -> Self {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.closes.iter().map(|c| c.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();

        let columns = series
            .iter()
            .map(|s| {
                let mut column = vec![None; dates.len()];
                for c in &s.closes {
                    column[row_of[&c.date]] = Some(c.close);
                }
                column
            })
            .collect();

        Self {
            symbols: series.iter().map(|s| s.symbol.clone()).collect(),
            dates,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn close(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(symbol)?[row]
    }
}
