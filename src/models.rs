//! Value types shared by valuation, quota and cost computations
//!
//! Titles and portfolios are built once from user input and never mutated.
//! Series are derived per call and read-only once returned.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{Result, TesouroError};
use crate::tesouro::{self, ProductType};

/// How a title's size was given: units held or cash invested at acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Quantity(Decimal),
    Invested(Decimal),
}

impl Position {
    fn amount(&self) -> Decimal {
        match self {
            Position::Quantity(q) => *q,
            Position::Invested(v) => *v,
        }
    }

    /// Units held, given the unit price on the acquisition date
    pub fn quantity_at(&self, unit_price: Decimal) -> Result<Decimal> {
        match self {
            Position::Quantity(q) => Ok(*q),
            Position::Invested(amount) => amount.checked_div(unit_price).ok_or_else(|| {
                TesouroError::InvalidInput(format!(
                    "cannot convert invested amount {} at unit price {}",
                    amount, unit_price
                ))
            }),
        }
    }
}

/// One Tesouro Direto holding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub product: ProductType,
    pub maturity: NaiveDate,
    pub acquired: NaiveDate,
    pub position: Position,
}

impl Title {
    pub fn new(
        product: ProductType,
        maturity: NaiveDate,
        acquired: NaiveDate,
        position: Position,
    ) -> Result<Self> {
        if acquired > maturity {
            return Err(TesouroError::InvalidInput(format!(
                "acquisition date {} is after maturity {}",
                acquired, maturity
            )));
        }
        if position.amount() <= Decimal::ZERO {
            return Err(TesouroError::InvalidInput(format!(
                "position must be positive, got {}",
                position.amount()
            )));
        }
        Ok(Self {
            product,
            maturity,
            acquired,
            position,
        })
    }

    /// Build from a feed product name; fails with `UnknownProductType`
    pub fn from_product_name(
        name: &str,
        maturity: NaiveDate,
        acquired: NaiveDate,
        position: Position,
    ) -> Result<Self> {
        Self::new(ProductType::from_name(name)?, maturity, acquired, position)
    }

    pub fn label(&self) -> String {
        tesouro::holding_label(self.product, self.maturity, self.acquired)
    }
}

/// Immutable ordered collection of titles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Portfolio {
    titles: Vec<Title>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new portfolio with `title` appended; `self` is untouched.
    pub fn append(&self, title: Title) -> Portfolio {
        let mut titles = self.titles.clone();
        titles.push(title);
        Portfolio { titles }
    }

    pub fn titles(&self) -> &[Title] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Titles ordered by acquisition date, ties kept in insertion order
    pub fn by_acquisition(&self) -> Vec<&Title> {
        let mut sorted: Vec<&Title> = self.titles.iter().collect();
        sorted.sort_by_key(|t| t.acquired);
        sorted
    }
}

impl FromIterator<Title> for Portfolio {
    fn from_iter<I: IntoIterator<Item = Title>>(iter: I) -> Self {
        Portfolio {
            titles: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self { date, value }
    }
}

/// Unit prices of one bond identity, strictly increasing in date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub product: ProductType,
    pub maturity: NaiveDate,
    points: Vec<SeriesPoint>,
}

impl PriceSeries {
    pub fn new(product: ProductType, maturity: NaiveDate, points: Vec<SeriesPoint>) -> Result<Self> {
        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(TesouroError::InvalidInput(format!(
                "price series dates must be strictly increasing ({} then {})",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self {
            product,
            maturity,
            points,
        })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// First observation on or after `date`
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<&SeriesPoint> {
        let idx = self.points.partition_point(|p| p.date < date);
        self.points.get(idx)
    }
}

/// Mark-to-market values of one holding (or a portfolio total)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSeries {
    pub label: String,
    /// `None` for portfolio aggregates
    pub product: Option<ProductType>,
    points: Vec<SeriesPoint>,
}

impl ValuationSeries {
    pub fn new(label: impl Into<String>, product: Option<ProductType>, points: Vec<SeriesPoint>) -> Self {
        Self {
            label: label.into(),
            product,
            points,
        }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Suffix of the series with dates on or after `date`
    pub fn since(&self, date: NaiveDate) -> ValuationSeries {
        let idx = self.points.partition_point(|p| p.date < date);
        ValuationSeries {
            label: self.label.clone(),
            product: self.product,
            points: self.points[idx..].to_vec(),
        }
    }
}

/// One calendar date of a portfolio's quota walk
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaRow {
    pub date: NaiveDate,
    pub total_mtm: Decimal,
    pub quota_count: Decimal,
    pub quota_price: Decimal,
    pub daily_return: Decimal,
    pub cumulative_return: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSeries {
    rows: Vec<QuotaRow>,
}

impl QuotaSeries {
    pub(crate) fn from_rows(rows: Vec<QuotaRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[QuotaRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&QuotaRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&QuotaRow> {
        self.rows.last()
    }

    pub fn cumulative_return(&self) -> Decimal {
        self.rows
            .last()
            .map(|r| r.cumulative_return)
            .unwrap_or(Decimal::ZERO)
    }

    /// Quota-price return over the last `periods` observations
    pub fn trailing_return(&self, periods: usize) -> Option<Decimal> {
        if periods == 0 || self.rows.len() <= periods {
            return None;
        }
        let end = self.rows.last()?.quota_price;
        let start = self.rows[self.rows.len() - 1 - periods].quota_price;
        end.checked_div(start).map(|ratio| ratio - Decimal::ONE)
    }

    /// Total mark-to-market of the portfolio as a plain value series
    pub fn mtm_series(&self) -> ValuationSeries {
        ValuationSeries::new(
            "PORTFOLIO",
            None,
            self.rows
                .iter()
                .map(|r| SeriesPoint::new(r.date, r.total_mtm))
                .collect(),
        )
    }
}

/// Costs deducted from a gross gain; all three share the same gain base
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub final_value: Decimal,
    pub gross_gain: Decimal,
    pub business_days_held: u32,
    pub income_tax_rate: Decimal,
    pub income_tax: Decimal,
    pub custody_fee: Decimal,
    pub transaction_tax_rate: Decimal,
    pub transaction_tax: Decimal,
    pub total: Decimal,
}

impl CostBreakdown {
    pub fn net_return(&self) -> Decimal {
        self.gross_gain - self.total
    }

    /// Final value after costs
    pub fn net_value(&self) -> Decimal {
        self.final_value - self.total
    }
}
