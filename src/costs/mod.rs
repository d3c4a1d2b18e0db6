// Costs module - income tax, IOF and custody fee on Tesouro Direto gains

pub mod custody;
pub mod income_tax;
pub mod iof;

use rust_decimal::Decimal;
use tracing::debug;

use crate::calendar::{BrazilianCalendar, BusinessCalendar};
use crate::error::{Result, TesouroError};
use crate::models::{CostBreakdown, ValuationSeries};
use crate::quota::PortfolioValuation;
use crate::valuation::TitleValuation;

pub use custody::{custody_fee, CustodyFee};
pub use income_tax::income_tax_rate;
pub use iof::{RegressiveIof, TransactionTaxTable};

/// Turns a gross gain into a net one. Income tax, IOF and custody fee are all
/// measured against the same gross gain and summed, never chained.
#[derive(Debug, Clone, Default)]
pub struct CostEngine<C = BrazilianCalendar, T = RegressiveIof> {
    calendar: C,
    transaction_tax: T,
}

impl CostEngine {
    /// National holiday calendar with the regulatory IOF table
    pub fn brazilian() -> Self {
        Self::new(BrazilianCalendar::new(), RegressiveIof)
    }
}

impl<C: BusinessCalendar, T: TransactionTaxTable> CostEngine<C, T> {
    pub fn new(calendar: C, transaction_tax: T) -> Self {
        Self {
            calendar,
            transaction_tax,
        }
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Business days between the first and last point of `series`
    pub fn holding_days(&self, series: &ValuationSeries) -> u32 {
        match (series.first(), series.last()) {
            (Some(first), Some(last)) => self.calendar.business_days(first.date, last.date),
            _ => 0,
        }
    }

    /// Income tax, IOF and (optionally) custody fee on `series` held for
    /// `business_days_held` business days.
    ///
    /// Income tax and IOF are levied on `max(gross_gain, 0)`: a loss pays
    /// neither, while the custody fee is due regardless since it is charged
    /// on value, not on gain. Fails with `InsufficientData` below two points.
    pub fn assess(
        &self,
        series: &ValuationSeries,
        invested: Decimal,
        business_days_held: u32,
        apply_custody_fee: bool,
    ) -> Result<CostBreakdown> {
        let final_value = final_value(series)?;
        let custody = if apply_custody_fee {
            custody_fee(series, &self.calendar)?.total
        } else {
            Decimal::ZERO
        };
        Ok(self.breakdown(&series.label, final_value, invested, business_days_held, custody))
    }

    fn breakdown(
        &self,
        label: &str,
        final_value: Decimal,
        invested: Decimal,
        business_days_held: u32,
        custody: Decimal,
    ) -> CostBreakdown {
        let gross_gain = final_value - invested;
        let taxable_gain = gross_gain.max(Decimal::ZERO);

        let income_tax_rate = income_tax_rate(business_days_held);
        let income_tax = taxable_gain * income_tax_rate;

        let transaction_tax_rate = if business_days_held < iof::IOF_FREE_AFTER_DAYS {
            self.transaction_tax.rate(business_days_held)
        } else {
            Decimal::ZERO
        };
        let transaction_tax = taxable_gain * transaction_tax_rate;

        debug!(
            "{}: gain {} over {} business days, IR {}, IOF {}, custody {}",
            label,
            gross_gain,
            business_days_held,
            income_tax_rate,
            transaction_tax_rate,
            custody
        );

        CostBreakdown {
            final_value,
            gross_gain,
            business_days_held,
            income_tax_rate,
            income_tax,
            custody_fee: custody,
            transaction_tax_rate,
            transaction_tax,
            total: income_tax + custody + transaction_tax,
        }
    }

    /// Costs of one valued title held until its last priced date
    pub fn assess_title(
        &self,
        valuation: &TitleValuation,
        apply_custody_fee: bool,
    ) -> Result<CostBreakdown> {
        let series = &valuation.since_acquisition;
        self.assess(
            series,
            valuation.invested,
            self.holding_days(series),
            apply_custody_fee,
        )
    }

    /// Costs of a whole portfolio held until its last priced date.
    ///
    /// Gains are taxed on the summed mark-to-market against the summed
    /// amount invested, with the holding period of the oldest title. The
    /// custody fee is charged per title, so each Tesouro Selic position keeps
    /// its own fee-free allowance.
    pub fn assess_portfolio(
        &self,
        valuation: &PortfolioValuation,
        apply_custody_fee: bool,
    ) -> Result<CostBreakdown> {
        let series = valuation.quotas.mtm_series();
        let final_value = final_value(&series)?;
        let invested: Decimal = valuation.titles.iter().map(|t| t.invested).sum();

        let custody = if apply_custody_fee {
            valuation
                .titles
                .iter()
                .map(|t| custody_fee(&t.since_acquisition, &self.calendar).map(|fee| fee.total))
                .sum::<Result<Decimal>>()?
        } else {
            Decimal::ZERO
        };

        let days = self.holding_days(&series);
        Ok(self.breakdown(&series.label, final_value, invested, days, custody))
    }
}

/// Last value of a series long enough to establish a gain
fn final_value(series: &ValuationSeries) -> Result<Decimal> {
    match series.last() {
        Some(last) if series.len() >= 2 => Ok(last.value),
        _ => Err(TesouroError::InsufficientData {
            required: 2,
            actual: series.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesPoint;
    use crate::tesouro::ProductType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn two_points(product: ProductType, start: Decimal, end: Decimal) -> ValuationSeries {
        ValuationSeries::new(
            "TEST",
            Some(product),
            vec![
                SeriesPoint::new(d(2024, 3, 1), start),
                SeriesPoint::new(d(2024, 3, 8), end),
            ],
        )
    }

    #[test]
    fn test_income_tax_for_400_days() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Prefixado, dec!(10000), dec!(11000));
        let costs = engine.assess(&series, dec!(10000), 400, false).unwrap();
        assert_eq!(costs.gross_gain, dec!(1000));
        assert_eq!(costs.income_tax, dec!(175));
        assert_eq!(costs.transaction_tax, Decimal::ZERO);
        assert_eq!(costs.custody_fee, Decimal::ZERO);
        assert_eq!(costs.total, dec!(175));
        assert_eq!(costs.net_return(), dec!(825));
        assert_eq!(costs.net_value(), dec!(10825));
    }

    #[test]
    fn test_short_holding_pays_iof() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Prefixado, dec!(10000), dec!(10100));
        let costs = engine.assess(&series, dec!(10000), 5, false).unwrap();
        assert_eq!(costs.transaction_tax_rate, dec!(0.83));
        assert_eq!(costs.transaction_tax, dec!(83));
        assert_eq!(costs.income_tax, dec!(22.5));
        assert_eq!(costs.total, dec!(105.5));
    }

    #[test]
    fn test_loss_pays_no_tax() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Prefixado, dec!(10000), dec!(9900));
        let costs = engine.assess(&series, dec!(10000), 5, false).unwrap();
        assert_eq!(costs.gross_gain, dec!(-100));
        assert_eq!(costs.income_tax, Decimal::ZERO);
        assert_eq!(costs.transaction_tax, Decimal::ZERO);
    }

    #[test]
    fn test_assess_is_idempotent() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Ipca, dec!(3000), dec!(3100));
        let a = engine.assess(&series, dec!(3000), 12, true).unwrap();
        let b = engine.assess(&series, dec!(3000), 12, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let engine = CostEngine::brazilian();
        let series = ValuationSeries::new(
            "TEST",
            None,
            vec![SeriesPoint::new(d(2024, 3, 1), dec!(100))],
        );
        assert_eq!(
            engine.assess(&series, dec!(100), 1, false),
            Err(TesouroError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_custody_fee_is_added_flat() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Prefixado, dec!(10000), dec!(11000));
        let with_fee = engine.assess(&series, dec!(10000), 400, true).unwrap();
        let fee = custody_fee(&series, engine.calendar()).unwrap().total;
        assert!(fee > Decimal::ZERO);
        assert_eq!(with_fee.custody_fee, fee);
        assert_eq!(with_fee.total, dec!(175) + fee);
    }

    struct SelicFeed;

    impl crate::feed::PriceFeed for SelicFeed {
        fn price_series(
            &self,
            product: ProductType,
            maturity: NaiveDate,
        ) -> Result<crate::models::PriceSeries> {
            crate::models::PriceSeries::new(
                product,
                maturity,
                vec![
                    SeriesPoint::new(d(2023, 11, 1), dec!(9400)),
                    SeriesPoint::new(d(2024, 1, 2), dec!(9450)),
                    SeriesPoint::new(d(2024, 3, 1), dec!(9500)),
                ],
            )
        }
    }

    fn two_selic_positions() -> PortfolioValuation {
        use crate::models::{Portfolio, Position, Title};
        let title = |qty| {
            Title::new(
                ProductType::Selic,
                d(2029, 3, 1),
                d(2023, 11, 1),
                Position::Quantity(qty),
            )
            .unwrap()
        };
        let portfolio = Portfolio::new()
            .append(title(dec!(1)))
            .append(title(dec!(1)));
        crate::quota::value_portfolio(&SelicFeed, &portfolio).unwrap()
    }

    #[test]
    fn test_portfolio_custody_keeps_selic_allowance_per_position() {
        let engine = CostEngine::brazilian();
        let valuation = two_selic_positions();

        let costs = engine.assess_portfolio(&valuation, true).unwrap();
        assert_eq!(costs.custody_fee, Decimal::ZERO);
        assert_eq!(costs.final_value, dec!(19000));
        assert_eq!(costs.gross_gain, dec!(200));

        // The summed series alone would lose the allowance
        let summed = custody_fee(&valuation.quotas.mtm_series(), engine.calendar()).unwrap();
        assert!(summed.total > Decimal::ZERO);
    }

    #[test]
    fn test_portfolio_taxes_summed_gain() {
        let engine = CostEngine::brazilian();
        let valuation = two_selic_positions();
        let costs = engine.assess_portfolio(&valuation, false).unwrap();

        // 2023-11-01 .. 2024-03-01 is well past the IOF window
        assert!(costs.business_days_held > 30);
        assert_eq!(costs.transaction_tax, Decimal::ZERO);
        assert_eq!(costs.income_tax_rate, dec!(0.225));
        assert_eq!(costs.income_tax, dec!(45));
        assert_eq!(costs.net_value(), dec!(18955));
    }

    #[test]
    fn test_holding_days_uses_calendar() {
        let engine = CostEngine::brazilian();
        let series = two_points(ProductType::Prefixado, dec!(1), dec!(2));
        // Fri 2024-03-01 .. Fri 2024-03-08
        assert_eq!(engine.holding_days(&series), 6);
    }
}
