//! CSV report adapter: writes the monthly strategy series and a summary of
//! the performance metrics next to it.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::DualmomError;
use crate::domain::metrics::PerformanceReport;
use crate::ports::report_port::ReportPort;
use std::path::{Path, PathBuf};

/// Columns: `date,symbol,strategy_return,cumulative`. Months without a
/// defined return are written with empty return and cumulative cells.
///
/// Metrics go to `<stem>_summary.csv` in the same directory as `metric,value`
/// rows; an undefined Sharpe ratio is an empty cell.
pub struct CsvReportAdapter;

pub fn summary_path(output_path: &str) -> PathBuf {
    let path = Path::new(output_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    path.with_file_name(format!("{stem}_summary.csv"))
}

fn write_summary(report: &PerformanceReport, path: &Path) -> Result<(), DualmomError> {
    let mut wtr = csv::Writer::from_path(path).map_err(report_error)?;
    let rows = [
        ("total_return", format!("{:.6}", report.total_return)),
        ("cagr", format!("{:.6}", report.cagr)),
        ("volatility", format!("{:.6}", report.volatility)),
        (
            "sharpe_ratio",
            report
                .sharpe_ratio
                .map(|s| format!("{:.6}", s))
                .unwrap_or_default(),
        ),
        ("max_drawdown", format!("{:.6}", report.max_drawdown)),
        ("months", report.months.to_string()),
        ("start_date", report.start_date.to_string()),
        ("end_date", report.end_date.to_string()),
        ("years", format!("{:.4}", report.years)),
    ];
    wtr.write_record(["metric", "value"]).map_err(report_error)?;
    for (metric, value) in rows {
        wtr.write_record([metric, value.as_str()])
            .map_err(report_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn report_error(e: impl std::fmt::Display) -> DualmomError {
    DualmomError::Report {
        reason: e.to_string(),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        report: &PerformanceReport,
        output_path: &str,
    ) -> Result<(), DualmomError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(report_error)?;
        wtr.write_record(["date", "symbol", "strategy_return", "cumulative"])
            .map_err(report_error)?;

        let mut curve = result.curve.iter().peekable();
        for month in &result.months {
            let cumulative = match curve.peek() {
                Some(p) if p.date == month.date && month.strategy_return.is_some() => {
                    curve.next().map(|p| format!("{:.6}", p.cumulative))
                }
                _ => None,
            };
            wtr.write_record([
                month.date.to_string(),
                result.symbol_of(month).unwrap_or_default().to_string(),
                month
                    .strategy_return
                    .map(|r| format!("{:.6}", r))
                    .unwrap_or_default(),
                cumulative.unwrap_or_default(),
            ])
            .map_err(report_error)?;
        }

        wtr.flush()?;

        write_summary(report, &summary_path(output_path))
    }
}
