//! Single-bond mark-to-market valuation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TesouroError};
use crate::feed::PriceFeed;
use crate::models::{PriceSeries, SeriesPoint, Title, ValuationSeries};
use crate::quota::resolve_trading_date;
use crate::tesouro;

/// Valuation of one title against its price history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleValuation {
    pub title: Title,
    /// Acquisition date moved forward to the first priced date
    pub effective_date: NaiveDate,
    pub quantity: Decimal,
    pub invested: Decimal,
    /// Every date in the feed, kept for charting
    pub full: ValuationSeries,
    pub since_acquisition: ValuationSeries,
}

/// `price × quantity` for every feed date, plus the suffix from `acquired` on.
pub fn value(
    price_series: &PriceSeries,
    quantity: Decimal,
    acquired: NaiveDate,
) -> Result<(ValuationSeries, ValuationSeries)> {
    if price_series.is_empty() {
        return Err(TesouroError::bond_not_found(
            price_series.product.name(),
            price_series.maturity,
        ));
    }
    if quantity <= Decimal::ZERO {
        return Err(TesouroError::InvalidInput(format!(
            "quantity must be positive, got {}",
            quantity
        )));
    }
    if price_series.first_on_or_after(acquired).is_none() {
        return Err(TesouroError::NoValuationData(format!(
            "no {} prices on or after {}",
            price_series.product, acquired
        )));
    }

    let label = tesouro::holding_label(price_series.product, price_series.maturity, acquired);
    let points = price_series
        .points()
        .iter()
        .map(|p| SeriesPoint::new(p.date, p.value * quantity))
        .collect();
    let full = ValuationSeries::new(label, Some(price_series.product), points);
    let since_acquisition = full.since(acquired);
    Ok((full, since_acquisition))
}

/// Fetch the title's price history and value it
pub fn value_title(feed: &dyn PriceFeed, title: &Title) -> Result<TitleValuation> {
    let prices = feed.price_series(title.product, title.maturity)?;
    let dates: Vec<NaiveDate> = prices.points().iter().map(|p| p.date).collect();
    let effective_date = resolve_trading_date(&dates, title.acquired).ok_or_else(|| {
        TesouroError::bond_not_found(title.product.name(), title.maturity)
    })?;
    let entry_price = prices
        .first_on_or_after(effective_date)
        .map(|p| p.value)
        .ok_or_else(|| TesouroError::NoValuationData(title.label()))?;
    let quantity = title.position.quantity_at(entry_price)?;

    let (mut full, mut since_acquisition) = value(&prices, quantity, title.acquired)?;
    full.label = title.label();
    since_acquisition.label = title.label();
    let invested = since_acquisition
        .first()
        .map(|p| p.value)
        .unwrap_or(Decimal::ZERO);

    debug!(
        "Valued {}: {} units from {}, invested {}",
        title.label(),
        quantity,
        effective_date,
        invested
    );

    Ok(TitleValuation {
        title: title.clone(),
        effective_date,
        quantity,
        invested,
        full,
        since_acquisition,
    })
}

/// Cumulative unit-price return from `acquired` forward; first point is zero.
pub fn return_series(price_series: &PriceSeries, acquired: NaiveDate) -> Result<ValuationSeries> {
    let entry = price_series.first_on_or_after(acquired).ok_or_else(|| {
        TesouroError::NoValuationData(format!(
            "no {} prices on or after {}",
            price_series.product, acquired
        ))
    })?;
    if entry.value <= Decimal::ZERO {
        return Err(TesouroError::InvalidInput(format!(
            "non-positive unit price {} on {}",
            entry.value, entry.date
        )));
    }
    let base = entry.value;

    let points = price_series
        .points()
        .iter()
        .filter(|p| p.date >= entry.date)
        .map(|p| SeriesPoint::new(p.date, p.value / base - Decimal::ONE))
        .collect();
    Ok(ValuationSeries::new(
        tesouro::holding_label(price_series.product, price_series.maturity, acquired),
        Some(price_series.product),
        points,
    ))
}
