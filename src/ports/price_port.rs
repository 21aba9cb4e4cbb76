//! Price history port trait.

use crate::domain::error::DualmomError;
use crate::domain::price::DailyClose;
use chrono::NaiveDate;

pub trait PricePort {
    /// Daily closes for `symbol` within `[start_date, end_date]`, ascending.
    ///
    /// Returns `DualmomError::DataUnavailable` when the symbol has zero bars
    /// in range.
    fn get_daily_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyClose>, DualmomError>;
}
