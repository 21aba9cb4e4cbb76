//! CSV file price history adapter.
//!
//! One file per symbol at `<base_path>/<SYMBOL>.csv` with a header row that
//! names at least a `date` and a `close` column. Other columns are ignored.

use crate::domain::error::DualmomError;
use crate::domain::price::DailyClose;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn source_error(reason: String) -> DualmomError {
    DualmomError::PriceSource { reason }
}

impl PricePort for CsvPriceAdapter {
    fn get_daily_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyClose>, DualmomError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| source_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| source_error(format!("CSV header error in {}: {}", path.display(), e)))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| source_error(format!("missing {} column in {}", name, path.display())))
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut closes = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| source_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| source_error("missing date value".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| source_error(format!("invalid date format: {}", e)))?;

            if date < start_date || date > end_date {
                continue;
            }

            let close: f64 = record
                .get(close_col)
                .ok_or_else(|| source_error("missing close value".into()))?
                .trim()
                .parse()
                .map_err(|e| source_error(format!("invalid close value: {}", e)))?;

            let bar = DailyClose::new(date, close);
            if !bar.is_valid() {
                return Err(source_error(format!(
                    "close must be a positive number, got {} on {} in {}",
                    close,
                    date,
                    path.display()
                )));
            }
            closes.push(bar);
        }

        if closes.is_empty() {
            return Err(DualmomError::DataUnavailable {
                symbol: symbol.to_string(),
                start: start_date.to_string(),
                end: end_date.to_string(),
            });
        }

        closes.sort_by_key(|c| c.date);
        debug!(symbol, bars = closes.len(), path = %path.display(), "loaded closes");
        Ok(closes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("SPY.csv"), csv_content).unwrap();
        fs::write(path.join("QQQ.csv"), "Date,Close\n2024-01-15,400.5\n").unwrap();
        fs::write(path.join("IWM.csv"), "date,close\n").unwrap();
        fs::write(path.join("BAD.csv"), "date,open\n2024-01-15,1.0\n").unwrap();

        (dir, path)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reads_close_column_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let closes = adapter
            .get_daily_closes("SPY", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();

        assert_eq!(closes.len(), 3);
        assert_eq!(closes[0], DailyClose::new(d(2024, 1, 15), 105.0));
        assert_eq!(closes[2], DailyClose::new(d(2024, 1, 17), 115.0));
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        let closes = adapter
            .get_daily_closes("QQQ", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        assert_eq!(closes, vec![DailyClose::new(d(2024, 1, 15), 400.5)]);
    }

    #[test]
    fn filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let closes = adapter
            .get_daily_closes("SPY", d(2024, 1, 16), d(2024, 1, 16))
            .unwrap();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].date, d(2024, 1, 16));
    }

    #[test]
    fn empty_range_is_data_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let err = adapter
            .get_daily_closes("SPY", d(2023, 1, 1), d(2023, 12, 31))
            .unwrap_err();
        assert!(matches!(err, DualmomError::DataUnavailable { symbol, .. } if symbol == "SPY"));

        let err = adapter
            .get_daily_closes("IWM", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, DualmomError::DataUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        let err = adapter
            .get_daily_closes("XYZ", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(matches!(err, DualmomError::PriceSource { .. }));
    }

    #[test]
    fn non_positive_or_non_finite_close_is_rejected() {
        let dir = TempDir::new().unwrap();
        for (symbol, close) in [("NAN", "NaN"), ("INF", "inf"), ("ZERO", "0"), ("NEG", "-1.5")] {
            fs::write(
                dir.path().join(format!("{symbol}.csv")),
                format!("date,close\n2024-01-15,100.0\n2024-01-16,{close}\n"),
            )
            .unwrap();
        }
        let adapter = CsvPriceAdapter::new(dir.path().to_path_buf());

        for symbol in ["NAN", "INF", "ZERO", "NEG"] {
            let err = adapter
                .get_daily_closes(symbol, d(2024, 1, 1), d(2024, 1, 31))
                .unwrap_err();
            assert!(
                matches!(&err, DualmomError::PriceSource { reason } if reason.contains("2024-01-16")),
                "{symbol}: {err}"
            );
        }
    }

    #[test]
    fn missing_close_column() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        let err = adapter
            .get_daily_closes("BAD", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap_err();
        assert!(err.to_string().contains("missing close column"));
    }
}
