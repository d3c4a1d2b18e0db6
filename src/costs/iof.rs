use once_cell::sync::Lazy;
use rust_decimal::Decimal;

/// Positions held this many days or more pay no IOF
pub const IOF_FREE_AFTER_DAYS: u32 = 30;

/// Percent of the gain withheld as IOF, indexed by days held (0–29)
const REGRESSIVE_IOF_PERCENT: [u32; 30] = [
    100, 96, 93, 90, 86, 83, 80, 76, 73, 70, 66, 63, 60, 56, 53, 50, 46, 43, 40, 36, 33, 30, 26,
    23, 20, 16, 13, 10, 6, 3,
];

static REGRESSIVE_IOF: Lazy<Vec<Decimal>> = Lazy::new(|| {
    REGRESSIVE_IOF_PERCENT
        .iter()
        .map(|pct| Decimal::new(*pct as i64, 2))
        .collect()
});

/// Short-holding transaction tax lookup
pub trait TransactionTaxTable {
    /// Fraction of the gain due for a position held `days_held` days
    fn rate(&self, days_held: u32) -> Decimal;
}

/// The regulatory IOF table for investments
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressiveIof;

impl TransactionTaxTable for RegressiveIof {
    fn rate(&self, days_held: u32) -> Decimal {
        if days_held >= IOF_FREE_AFTER_DAYS {
            return Decimal::ZERO;
        }
        REGRESSIVE_IOF
            .get(days_held as usize)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}
