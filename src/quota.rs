//! Portfolio quota engine
//!
//! Portfolio return is measured the way funds do it: the first holding sets
//! the initial quota count at a quota price of 1, and every later purchase
//! buys new quotas at the previous day's quota price. Quota price then moves
//! only with market value, so late inflows do not inflate the return of
//! earlier capital.
//!
//! Algorithm:
//! 1. Sort holdings by acquisition date (stable)
//! 2. Align each holding from its acquisition date onto the union calendar
//! 3. Resolve each acquisition to its first priced date (bounded forward scan)
//! 4. Walk the calendar:
//!    - `quota_count[d] = quota_count[d-1] + inflow[d] / quota_price[d-1]`
//!    - `quota_price[d] = total_mtm[d] / quota_count[d]`
//!    - `daily_return[d] = quota_price[d] / quota_price[d-1] - 1`
//! 5. Chain daily returns into the cumulative return

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{Result, TesouroError};
use crate::feed::PriceFeed;
use crate::models::{Portfolio, QuotaRow, QuotaSeries, ValuationSeries};
use crate::valuation::{value_title, TitleValuation};

/// Longest run of calendar days skipped when moving an acquisition date
/// forward to a priced date
pub const MAX_FORWARD_SCAN_DAYS: u64 = 31;

/// One holding fed into [`compose`]
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub series: ValuationSeries,
    pub acquired: NaiveDate,
}

impl Holding {
    pub fn new(series: ValuationSeries, acquired: NaiveDate) -> Self {
        Self { series, acquired }
    }
}

impl From<&TitleValuation> for Holding {
    fn from(valuation: &TitleValuation) -> Self {
        Holding::new(valuation.since_acquisition.clone(), valuation.title.acquired)
    }
}

/// Move `date` forward one day at a time until it appears in `calendar`
/// (sorted ascending). Gives up after [`MAX_FORWARD_SCAN_DAYS`].
pub fn resolve_trading_date(calendar: &[NaiveDate], date: NaiveDate) -> Option<NaiveDate> {
    let mut candidate = date;
    for _ in 0..=MAX_FORWARD_SCAN_DAYS {
        if calendar.binary_search(&candidate).is_ok() {
            return Some(candidate);
        }
        candidate = candidate.succ_opt()?;
    }
    None
}

/// Chain-link the holdings into one quota series
pub fn compose(holdings: &[Holding]) -> Result<QuotaSeries> {
    if holdings.is_empty() {
        return Err(TesouroError::EmptyPortfolio);
    }

    let mut ordered: Vec<&Holding> = holdings.iter().collect();
    ordered.sort_by_key(|h| h.acquired);

    // Values from acquisition on; earlier dates are absent, not zero
    let aligned: Vec<BTreeMap<NaiveDate, Decimal>> = ordered
        .iter()
        .map(|h| {
            h.series
                .since(h.acquired)
                .points()
                .iter()
                .map(|p| (p.date, p.value))
                .collect()
        })
        .collect();

    let calendar: Vec<NaiveDate> = aligned
        .iter()
        .flat_map(|values| values.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if calendar.is_empty() {
        return Err(TesouroError::NoValuationData(
            "no priced dates on or after any acquisition".to_string(),
        ));
    }

    // Holdings sharing an entry date are one inflow event
    let mut inflows: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for (holding, values) in ordered.iter().zip(&aligned) {
        let own_dates: Vec<NaiveDate> = values.keys().copied().collect();
        let entry = resolve_trading_date(&own_dates, holding.acquired).ok_or_else(|| {
            TesouroError::NotFound(format!(
                "no price for {} within {} days of {}",
                holding.series.label, MAX_FORWARD_SCAN_DAYS, holding.acquired
            ))
        })?;
        *inflows.entry(entry).or_insert(Decimal::ZERO) += values[&entry];
    }

    let total_at = |date: &NaiveDate| -> Decimal {
        aligned.iter().filter_map(|values| values.get(date)).sum()
    };

    let first_date = calendar[0];
    let first_total = total_at(&first_date);
    if first_total <= Decimal::ZERO {
        return Err(TesouroError::InvalidInput(format!(
            "portfolio value on {} is {}",
            first_date, first_total
        )));
    }

    let mut rows = Vec::with_capacity(calendar.len());
    rows.push(QuotaRow {
        date: first_date,
        total_mtm: first_total,
        quota_count: first_total,
        quota_price: Decimal::ONE,
        daily_return: Decimal::ZERO,
        cumulative_return: Decimal::ZERO,
    });

    let mut growth = Decimal::ONE;
    for date in calendar.iter().skip(1) {
        let prev = rows[rows.len() - 1];
        let total_mtm = total_at(date);

        let quota_count = match inflows.get(date) {
            Some(inflow) => {
                let new_quotas = zero_guarded_div(*inflow, prev.quota_price, *date)?;
                debug!(
                    "Inflow of {} on {} buys {} quotas at {}",
                    inflow, date, new_quotas, prev.quota_price
                );
                prev.quota_count + new_quotas
            }
            None => prev.quota_count,
        };

        let quota_price = zero_guarded_div(total_mtm, quota_count, *date)?;
        let daily_return = zero_guarded_div(quota_price, prev.quota_price, *date)? - Decimal::ONE;
        growth *= Decimal::ONE + daily_return;

        rows.push(QuotaRow {
            date: *date,
            total_mtm,
            quota_count,
            quota_price,
            daily_return,
            cumulative_return: growth - Decimal::ONE,
        });
    }

    debug!(
        "Composed {} holdings over {} dates ({} inflow events)",
        holdings.len(),
        rows.len(),
        inflows.len()
    );
    Ok(QuotaSeries::from_rows(rows))
}

fn zero_guarded_div(numerator: Decimal, denominator: Decimal, date: NaiveDate) -> Result<Decimal> {
    numerator.checked_div(denominator).ok_or_else(|| {
        TesouroError::InvalidInput(format!(
            "cannot divide {} by {} on {}",
            numerator, denominator, date
        ))
    })
}

/// Valuation of every title plus the portfolio quota series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValuation {
    pub titles: Vec<TitleValuation>,
    pub quotas: QuotaSeries,
}

/// Value each title of `portfolio` against `feed` and compose the result
pub fn value_portfolio(feed: &dyn PriceFeed, portfolio: &Portfolio) -> Result<PortfolioValuation> {
    if portfolio.is_empty() {
        return Err(TesouroError::EmptyPortfolio);
    }

    let titles = portfolio
        .by_acquisition()
        .into_iter()
        .map(|title| value_title(feed, title))
        .collect::<Result<Vec<_>>>()?;
    let holdings: Vec<Holding> = titles.iter().map(Holding::from).collect();
    let quotas = compose(&holdings)?;

    Ok(PortfolioValuation { titles, quotas })
}
