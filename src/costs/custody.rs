//! B3 custody fee
//!
//! The fee is charged on the gross position value on the first business day
//! of January and July. A holding that starts or ends mid-semester pays a
//! fragment pro-rated over the 126 business days of a semester.
//!
//! Rates: 0.25% a year (0.125% a semester) before 2022, 0.20% a year (0.10% a
//! semester) from January 2022. Fragments use a flat 0.05%.
//!
//! Tesouro Selic positions are exempt up to R$ 10.000,00 and pay only on the
//! excess.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::calendar::BusinessCalendar;
use crate::error::{Result, TesouroError};
use crate::models::{SeriesPoint, ValuationSeries};

pub const SEMESTER_BUSINESS_DAYS: u32 = 126;
pub const FRAGMENT_RATE: Decimal = dec!(0.0005);
pub const FLOATING_RATE_ALLOWANCE: Decimal = dec!(10000);

/// Semester rate in force on `date`
pub fn half_year_rate(date: NaiveDate) -> Decimal {
    if (date.year(), date.month()) >= (2022, 1) {
        dec!(0.001)
    } else {
        dec!(0.00125)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemesterCharge {
    pub date: NaiveDate,
    pub base: Decimal,
    pub rate: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustodyFee {
    pub semesters: Vec<SemesterCharge>,
    pub opening_fragment: Decimal,
    pub closing_fragment: Decimal,
    pub total: Decimal,
}

fn fee_base(series: &ValuationSeries, value: Decimal) -> Decimal {
    match series.product {
        Some(product) if product.is_floating_rate() => {
            (value - FLOATING_RATE_ALLOWANCE).max(Decimal::ZERO)
        }
        _ => value,
    }
}

fn fragment(calendar: &dyn BusinessCalendar, from: NaiveDate, to: NaiveDate, base: Decimal) -> Decimal {
    let days = Decimal::from(calendar.business_days(from, to));
    days / Decimal::from(SEMESTER_BUSINESS_DAYS) * FRAGMENT_RATE * base
}

/// First observation of each January and July that begins after the
/// holding's start date
fn semester_boundaries(points: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let Some(start) = points.first().map(|p| p.date) else {
        return Vec::new();
    };
    let mut boundaries: Vec<SeriesPoint> = Vec::new();
    for point in points {
        let month = point.date.month();
        if month != 1 && month != 7 {
            continue;
        }
        let month_start = point.date.with_day(1).unwrap_or(point.date);
        if month_start <= start {
            continue;
        }
        let seen = boundaries
            .last()
            .is_some_and(|b| (b.date.year(), b.date.month()) == (point.date.year(), month));
        if !seen {
            boundaries.push(*point);
        }
    }
    boundaries
}

pub fn custody_fee(series: &ValuationSeries, calendar: &dyn BusinessCalendar) -> Result<CustodyFee> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => {
            return Err(TesouroError::InsufficientData {
                required: 1,
                actual: 0,
            })
        }
    };

    let boundaries = semester_boundaries(series.points());
    let (first_boundary, last_boundary) = match (boundaries.first(), boundaries.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => {
            // Held for less than a semester: one fragment over the whole period
            let closing = fragment(calendar, first.date, last.date, fee_base(series, last.value));
            return Ok(CustodyFee {
                semesters: Vec::new(),
                opening_fragment: Decimal::ZERO,
                closing_fragment: closing,
                total: closing,
            });
        }
    };

    let semesters: Vec<SemesterCharge> = boundaries
        .iter()
        .map(|b| {
            let base = fee_base(series, b.value);
            let rate = half_year_rate(b.date);
            SemesterCharge {
                date: b.date,
                base,
                rate,
                fee: base * rate,
            }
        })
        .collect();

    let opening_fragment = fragment(
        calendar,
        first.date,
        first_boundary.date,
        fee_base(series, first_boundary.value),
    );
    let closing_fragment = fragment(
        calendar,
        last_boundary.date,
        last.date,
        fee_base(series, last_boundary.value),
    );

    let total = semesters.iter().map(|s| s.fee).sum::<Decimal>() + opening_fragment + closing_fragment;
    Ok(CustodyFee {
        semesters,
        opening_fragment,
        closing_fragment,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::BrazilianCalendar;
    use crate::tesouro::ProductType;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(product: ProductType, points: &[(NaiveDate, Decimal)]) -> ValuationSeries {
        ValuationSeries::new(
            "TEST",
            Some(product),
            points.iter().map(|(d, v)| SeriesPoint::new(*d, *v)).collect(),
        )
    }

    /// Counts every day, so fragments are easy to check by hand
    struct EveryDay;

    impl BusinessCalendar for EveryDay {
        fn is_business_day(&self, _date: NaiveDate) -> bool {
            true
        }
    }

    #[test]
    fn test_half_year_rate_switch() {
        assert_eq!(half_year_rate(d(2021, 7, 1)), dec!(0.00125));
        assert_eq!(half_year_rate(d(2022, 1, 3)), dec!(0.001));
    }

    #[test]
    fn test_short_holding_single_fragment() {
        let s = series(
            ProductType::Prefixado,
            &[(d(2024, 2, 1), dec!(10000)), (d(2024, 3, 6), dec!(12600))],
        );
        let fee = custody_fee(&s, &EveryDay).unwrap();
        // 35 days / 126 * 0.05% * 12600
        assert!(fee.semesters.is_empty());
        assert_eq!(fee.total, dec!(35) / dec!(126) * dec!(0.0005) * dec!(12600));
    }

    #[test]
    fn test_semester_charges_and_fragments() {
        let s = series(
            ProductType::Prefixado,
            &[
                (d(2021, 5, 3), dec!(10000)),
                (d(2021, 7, 1), dec!(10100)),
                (d(2021, 7, 2), dec!(10110)),
                (d(2022, 1, 3), dec!(10500)),
                (d(2022, 3, 1), dec!(10700)),
            ],
        );
        let fee = custody_fee(&s, &EveryDay).unwrap();
        assert_eq!(fee.semesters.len(), 2);
        assert_eq!(fee.semesters[0].date, d(2021, 7, 1));
        assert_eq!(fee.semesters[0].fee, dec!(10100) * dec!(0.00125));
        assert_eq!(fee.semesters[1].fee, dec!(10500) * dec!(0.001));
        // 2021-05-03..2021-07-01 inclusive = 60 days
        assert_eq!(
            fee.opening_fragment,
            dec!(60) / dec!(126) * dec!(0.0005) * dec!(10100)
        );
        // 2022-01-03..2022-03-01 inclusive = 58 days
        assert_eq!(
            fee.closing_fragment,
            dec!(58) / dec!(126) * dec!(0.0005) * dec!(10500)
        );
        assert_eq!(
            fee.total,
            fee.semesters[0].fee + fee.semesters[1].fee + fee.opening_fragment + fee.closing_fragment
        );
    }

    #[test]
    fn test_start_inside_july_is_not_a_boundary() {
        let s = series(
            ProductType::Prefixado,
            &[(d(2023, 7, 10), dec!(1000)), (d(2023, 7, 20), dec!(1001))],
        );
        let fee = custody_fee(&s, &BrazilianCalendar::new()).unwrap();
        assert!(fee.semesters.is_empty());
    }

    #[test]
    fn test_selic_below_allowance_pays_nothing() {
        let s = series(
            ProductType::Selic,
            &[
                (d(2021, 5, 3), dec!(9000)),
                (d(2022, 1, 3), dec!(9400)),
                (d(2023, 3, 1), dec!(9500)),
            ],
        );
        let fee = custody_fee(&s, &BrazilianCalendar::new()).unwrap();
        assert_eq!(fee.total, Decimal::ZERO);
    }

    #[test]
    fn test_selic_pays_on_excess() {
        let s = series(
            ProductType::Selic,
            &[(d(2023, 12, 1), dec!(11000)), (d(2024, 1, 2), dec!(12000))],
        );
        let fee = custody_fee(&s, &EveryDay).unwrap();
        assert_eq!(fee.semesters[0].base, dec!(2000));
        assert_eq!(fee.semesters[0].fee, dec!(2));
    }

    #[test]
    fn test_empty_series() {
        let s = series(ProductType::Selic, &[]);
        assert!(custody_fee(&s, &EveryDay).is_err());
    }
}
