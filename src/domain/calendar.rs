//! Calendar-month grouping and business-month-end rules.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Last present date of every (year, month) group in an ascending date index.
pub fn month_end_dates(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut ends: Vec<NaiveDate> = Vec::new();
    for &date in dates {
        match ends.last_mut() {
            Some(last) if YearMonth::of(*last) == YearMonth::of(date) => *last = date,
            _ => ends.push(date),
        }
    }
    ends
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Last Monday-Friday of the month containing `date`. Exchange holidays are
/// not modelled.
pub fn last_business_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let first = date.with_day(1)?;
    let next_month = first.checked_add_months(chrono::Months::new(1))?;
    let mut day = next_month.checked_sub_days(Days::new(1))?;
    while !is_weekday(day) {
        day = day.checked_sub_days(Days::new(1))?;
    }
    Some(day)
}

pub fn is_last_business_day_of_month(date: NaiveDate) -> bool {
    last_business_day_of_month(date) == Some(date)
}
