use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Regressive income tax on fixed-income gains, by business days held:
/// up to 180 → 22.5%, 181–360 → 20%, 361–720 → 17.5%, above 720 → 15%.
pub fn income_tax_rate(business_days_held: u32) -> Decimal {
    match business_days_held {
        0..=180 => dec!(0.225),
        181..=360 => dec!(0.20),
        361..=720 => dec!(0.175),
        _ => dec!(0.15),
    }
}
