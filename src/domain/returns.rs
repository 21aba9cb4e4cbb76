//! Realized calendar-month returns compounded from daily closes.

use crate::domain::calendar::YearMonth;
use crate::domain::price::AlignedPrices;
use std::collections::BTreeMap;

/// Monthly return per symbol, keyed by calendar month.
///
/// A month is present for a symbol only when at least one daily return fell
/// inside it. Absent months are never reported as zero.
#[derive(Debug, Clone, Default)]
pub struct MonthlyReturns {
    symbols: Vec<String>,
    months: BTreeMap<YearMonth, Vec<Option<f64>>>,
}

impl MonthlyReturns {
    /// `Π(1 + r_daily) - 1` over each month. A daily return is taken against
    /// the symbol's previous present close, so gaps in one column do not
    /// break the chain.
    pub fn from_prices(prices: &AlignedPrices) -> Self {
        let mut months: BTreeMap<YearMonth, Vec<Option<f64>>> = BTreeMap::new();

        for (col, symbol) in prices.symbols.iter().enumerate() {
            let Some(closes) = prices.column(symbol) else {
                continue;
            };
            let mut prev: Option<f64> = None;
            for (row, close) in closes.iter().enumerate() {
                let Some(close) = *close else {
                    continue;
                };
                if let Some(p) = prev.filter(|p| *p > 0.0) {
                    let growth = close / p;
                    let month = YearMonth::of(prices.dates[row]);
                    let slot = &mut months
                        .entry(month)
                        .or_insert_with(|| vec![None; prices.symbols.len()])[col];
                    *slot = Some(slot.map_or(growth, |g| g * growth));
                }
                prev = Some(close);
            }
        }

        for growths in months.values_mut() {
            for g in growths.iter_mut() {
                *g = g.map(|g| g - 1.0);
            }
        }

        Self {
            symbols: prices.symbols.clone(),
            months,
        }
    }

    pub fn get(&self, month: YearMonth, symbol: &str) -> Option<f64> {
        let col = self.symbols.iter().position(|s| s == symbol)?;
        self.months.get(&month)?[col]
    }

    pub fn months(&self) -> impl Iterator<Item = YearMonth> + '_ {
        self.months.keys().copied()
    }
}
