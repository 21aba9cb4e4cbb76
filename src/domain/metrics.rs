//! Performance statistics over the monthly strategy curve.

use super::backtest::{BacktestResult, CurvePoint};
use super::error::DualmomError;
use chrono::NaiveDate;

const MONTHS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.25;
/// Volatility below this is treated as zero dispersion.
const MIN_VOLATILITY: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    /// `None` when the monthly returns have (numerically) zero dispersion.
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
    pub months: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub years: f64,
}

impl PerformanceReport {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Result<Self, DualmomError> {
        let curve = &result.curve;
        let (first, last) = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) if curve.len() >= 2 => (first, last),
            _ => {
                return Err(DualmomError::InsufficientHistory {
                    months: curve.len(),
                });
            }
        };

        let total_return = last.cumulative - 1.0;
        let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;
        if years <= 0.0 {
            return Err(DualmomError::InsufficientHistory {
                months: curve.len(),
            });
        }
        let cagr = (1.0 + total_return).powf(1.0 / years) - 1.0;

        let returns = result.defined_returns();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        // Sample standard deviation.
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let volatility = variance.sqrt() * MONTHS_PER_YEAR.sqrt();

        let sharpe_ratio = if volatility > MIN_VOLATILITY {
            Some((mean * MONTHS_PER_YEAR - risk_free_rate) / volatility)
        } else {
            None
        };

        let max_drawdown = compute_drawdown(curve);
        for (metric, value) in [
            ("total return", total_return),
            ("CAGR", cagr),
            ("volatility", volatility),
            ("max drawdown", max_drawdown),
        ]
        .into_iter()
        .chain(sharpe_ratio.map(|s| ("Sharpe ratio", s)))
        {
            if !value.is_finite() {
                return Err(DualmomError::NonFiniteMetric {
                    metric: metric.to_string(),
                });
            }
        }

        Ok(PerformanceReport {
            total_return,
            cagr,
            volatility,
            sharpe_ratio,
            max_drawdown,
            months: curve.len(),
            start_date: first.date,
            end_date: last.date,
            years,
        })
    }
}

/// Largest peak-to-trough decline of the cumulative curve, starting from one
/// unit of capital before the first month.
fn compute_drawdown(curve: &[CurvePoint]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for point in curve {
        if point.cumulative > peak {
            peak = point.cumulative;
        } else if peak > 0.0 {
            let dd = (peak - point.cumulative) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}
