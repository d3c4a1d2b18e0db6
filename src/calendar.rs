//! Business-day counting for the Brazilian market
//!
//! The cost engine only needs a count of business days between two dates, so
//! the calendar is a trait and the built-in implementation can be swapped for
//! an exchange-provided holiday list.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;

pub trait BusinessCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool;

    /// Business days in `[start, end]`, both ends inclusive. Zero when `start > end`.
    fn business_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_business_day(*d))
            .count() as u32
    }
}

/// Weekdays minus Brazilian national holidays
#[derive(Debug, Clone, Default)]
pub struct BrazilianCalendar {
    extra_holidays: BTreeSet<NaiveDate>,
}

impl BrazilianCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additional closures (e.g. one-off exchange holidays)
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            extra_holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.extra_holidays.contains(&date) {
            return true;
        }
        let fixed = matches!(
            (date.month(), date.day()),
            (1, 1) | (4, 21) | (5, 1) | (9, 7) | (10, 12) | (11, 2) | (11, 15) | (12, 25)
        );
        if fixed || (date.month() == 11 && date.day() == 20 && date.year() >= 2024) {
            return true;
        }
        match easter_sunday(date.year()) {
            Some(easter) => movable_feasts(easter).contains(&date),
            None => false,
        }
    }
}

impl BusinessCalendar for BrazilianCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }
}

/// Carnival Monday and Tuesday, Good Friday, Corpus Christi
fn movable_feasts(easter: NaiveDate) -> [NaiveDate; 4] {
    [
        easter - Days::new(48),
        easter - Days::new(47),
        easter - Days::new(2),
        easter + Days::new(60),
    ]
}

/// Anonymous Gregorian algorithm
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}
