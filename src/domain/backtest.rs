//! Backtest replay of the lagged signal against realized monthly returns.
//!
//! BacktestConfig defines the backtest parameters.

use crate::domain::calendar::YearMonth;
use crate::domain::price::AlignedPrices;
use crate::domain::returns::MonthlyReturns;
use crate::domain::signal::{AssetPair, Leg, SignalPoint};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub pair: AssetPair,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lookback: usize,
    pub risk_free_rate: f64,
}

/// One signal date of the replay. `strategy_return` is `None` when there was
/// no decision or no realized return for the chosen symbol in that month.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMonth {
    pub date: NaiveDate,
    pub choice: Option<Leg>,
    pub strategy_return: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub strategy_return: f64,
    /// Growth of one unit of capital through this month.
    pub cumulative: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub pair: AssetPair,
    pub months: Vec<StrategyMonth>,
    /// Defined months only, compounded in order.
    pub curve: Vec<CurvePoint>,
}

impl BacktestResult {
    pub fn defined_returns(&self) -> Vec<f64> {
        self.curve.iter().map(|p| p.strategy_return).collect()
    }

    pub fn undefined_months(&self) -> usize {
        self.months
            .iter()
            .filter(|m| m.strategy_return.is_none())
            .count()
    }

    pub fn symbol_of(&self, month: &StrategyMonth) -> Option<&str> {
        month.choice.map(|leg| self.pair.symbol(leg))
    }
}

/// Replays `lagged` decisions: each point's choice earns that symbol's return
/// over the calendar month containing the point's date.
pub fn run_backtest(
    prices: &AlignedPrices,
    lagged: &[SignalPoint],
    pair: &AssetPair,
) -> BacktestResult {
    let monthly = MonthlyReturns::from_prices(prices);

    let months: Vec<StrategyMonth> = lagged
        .iter()
        .map(|point| StrategyMonth {
            date: point.date,
            choice: point.choice,
            strategy_return: point
                .choice
                .and_then(|leg| monthly.get(YearMonth::of(point.date), pair.symbol(leg))),
        })
        .collect();

    let mut cumulative = 1.0;
    let curve = months
        .iter()
        .filter_map(|m| {
            m.strategy_return.map(|r| {
                cumulative *= 1.0 + r;
                CurvePoint {
                    date: m.date,
                    strategy_return: r,
                    cumulative,
                }
            })
        })
        .collect();

    BacktestResult {
        pair: pair.clone(),
        months,
        curve,
    }
}
