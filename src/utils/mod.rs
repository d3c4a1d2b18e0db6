//! Utility functions for formatting
//!
//! Formatting happens only at the display boundary; the engine keeps full
//! `Decimal` precision.

use rust_decimal::{Decimal, RoundingStrategy};

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include "R$ " prefix (Brazilian Real)
    BRL,
    /// No currency symbol (for table cells, unit prices, quota counts)
    None,
}

/// Formats a Decimal value using Brazilian locale conventions:
/// - Thousands separator: `.` (period)
/// - Decimal separator: `,` (comma)
///
/// # Examples
/// ```
/// use tesouro::utils::{format_with_places, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_with_places(dec!(1234.56), 2, CurrencySymbol::BRL),
///     "R$ 1.234,56"
/// );
/// assert_eq!(
///     format_with_places(dec!(10905.123456), 6, CurrencySymbol::None),
///     "10.905,123456"
/// );
/// ```
pub fn format_with_places(value: Decimal, places: u32, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let rounded = value
        .abs()
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);

    let formatted = format!("{:.*}", places as usize, rounded);
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, d)) => (i.to_string(), Some(d.to_string())),
        None => (formatted.clone(), None),
    };

    // Add thousands separators (.) to integer part
    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec!['.', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    let sign = if is_negative && !rounded.is_zero() { "-" } else { "" };
    let prefix = match symbol {
        CurrencySymbol::BRL => "R$ ",
        CurrencySymbol::None => "",
    };

    match decimal_part {
        Some(d) => format!("{}{}{},{}", prefix, sign, with_separators, d),
        None => format!("{}{}{}", prefix, sign, with_separators),
    }
}

/// Format as Brazilian Real with symbol: "R$ 1.234,56"
///
/// # Examples
/// ```
/// use tesouro::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
/// assert_eq!(format_currency(dec!(-500)), "R$ -500,00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_with_places(value, 2, CurrencySymbol::BRL)
}

/// Format number only (no symbol): "1.234,56"
pub fn format_decimal_br(value: Decimal, places: u32) -> String {
    format_with_places(value, places, CurrencySymbol::None)
}

/// Format a fraction as a percentage: 0.0523 -> "5,23%"
///
/// # Examples
/// ```
/// use tesouro::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(dec!(0.0523)), "5,23%");
/// assert_eq!(format_percent(dec!(-0.175)), "-17,50%");
/// ```
pub fn format_percent(fraction: Decimal) -> String {
    format!(
        "{}%",
        format_with_places(fraction * Decimal::ONE_HUNDRED, 2, CurrencySymbol::None)
    )
}
